pub mod approval;
pub mod blockchain_client; // Insight 索引器客户端
pub mod finalizer;
pub mod history;
pub mod key_workflow;
pub mod transaction_builder; // 多签签名器

pub use blockchain_client::{ChainBackend, IndexerClient};
pub use transaction_builder::{sign_transaction, UtxoRef};
