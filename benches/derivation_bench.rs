//! 性能基准测试
//! 使用criterion测量派生、地址生成与签名耗时

use bitcoin::hashes::Hash;
use bitcoin::secp256k1::SecretKey;
use bitcoin::{Amount, TxOut, Txid};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sspcore::domain::address::build_multisig_descriptor;
use sspcore::domain::transaction::{prev_txid_hex, unsigned_input, UtxoTransaction};
use sspcore::prelude::*;

const MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const XPUB_A: &str = "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8";
const XPUB_B: &str = "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw";

fn bench_master_derivation(c: &mut Criterion) {
    let seed = SeedPhrase::parse(MNEMONIC).unwrap();
    c.bench_function("derive_master_key_pair", |b| {
        b.iter(|| {
            black_box(derive_master_key_pair(&seed, 48, 19167, 0, ScriptType::P2sh).unwrap())
        })
    });
}

fn bench_multisig_address(c: &mut Criterion) {
    c.bench_function("generate_multisig_address", |b| {
        b.iter(|| {
            black_box(
                generate_multisig_address(XPUB_A, XPUB_B, black_box(0), 0, ChainId::Flux).unwrap(),
            )
        })
    });
}

fn bench_sign_sapling(c: &mut Criterion) {
    let key = AddressKeypair::from_secret_key(SecretKey::from_slice(&[1u8; 32]).unwrap());
    let other = AddressKeypair::from_secret_key(SecretKey::from_slice(&[2u8; 32]).unwrap());
    let wallet = build_multisig_descriptor(
        2,
        vec![*key.public_key(), *other.public_key()],
        ChainId::Flux,
    )
    .unwrap();

    let input = unsigned_input(Txid::from_byte_array([3u8; 32]), 0);
    let utxos = vec![UtxoRef {
        txid: prev_txid_hex(&input),
        vout: 0,
        satoshis: 2_000,
        script_pub_key: None,
        redeem_script: Some(wallet.redeem_script_hex()),
    }];
    let raw = UtxoTransaction::unsigned(
        ChainId::Flux.params().tx_family,
        vec![input],
        vec![TxOut {
            value: Amount::from_sat(1_000),
            script_pubkey: Default::default(),
        }],
    )
    .to_hex();
    let redeem = wallet.redeem_script_hex();

    c.bench_function("sign_transaction_flux", |b| {
        b.iter(|| black_box(sign_transaction(&raw, ChainId::Flux, &key, &redeem, &utxos).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_master_derivation,
    bench_multisig_address,
    bench_sign_sapling
);
criterion_main!(benches);
