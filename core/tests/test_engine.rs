// # Vectored engine behaviour
//
// Cipher round trips, hash placement, alignment, IV chaining and the
// multi-segment scenario, all driven through a device context.

use cryptodev_core::config::EngineConfig;
use cryptodev_core::crypto::{
    CipherAlg, CipherHandle, CryptoError, HashAlg, HashHandle, KeyBounds, SoftwareCipher,
    SoftwareProvider, TransformProvider,
};
use cryptodev_core::device::{CryptoContext, CryptoDevice};
use cryptodev_core::engine::{CryptOutput, CryptRequest, Segment, SegmentFlags};
use cryptodev_core::session::{SessionId, SessionOp};
use cryptodev_core::types::{CryptodevError, ErrorKind};
use hmac::{Hmac, Mac};
use proptest::prelude::*;
use sha2::{Digest, Sha256};
use std::sync::Arc;

const AES_KEY: [u8; 16] = [0x2b; 16];
const MAC_KEY: &[u8] = b"session mac key";
const IV: [u8; 16] = [0x0f; 16];

fn ctx() -> CryptoContext {
    CryptoDevice::software().open()
}

fn key_for(alg: CipherAlg) -> Vec<u8> {
    let len = match alg {
        CipherAlg::DesCbc => 8,
        CipherAlg::TdesCbc => 24,
        CipherAlg::BlowfishCbc => 16,
        CipherAlg::AesCbc => 16,
        CipherAlg::CamelliaCbc => 32,
    };
    (0..len as u8).map(|b| b.wrapping_mul(37).wrapping_add(11)).collect()
}

fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
    for p in parts {
        mac.update(p);
    }
    mac.finalize().into_bytes().to_vec()
}

fn aes_hmac_session(ctx: &CryptoContext) -> SessionId {
    let op = SessionOp::cipher(CipherAlg::AesCbc, &AES_KEY).with_mac(HashAlg::HmacSha256, MAC_KEY);
    ctx.create_session(&op).unwrap()
}

fn run(ctx: &CryptoContext, req: &CryptRequest<'_>) -> Result<CryptOutput, CryptodevError> {
    let mut out = CryptOutput::default();
    ctx.cryptv(req, &mut out).map(|_| out)
}

// ## 1️⃣ Round trip per cipher

proptest! {
    #[test]
    fn every_cipher_round_trips(
        alg_index in 0usize..CipherAlg::ALL.len(),
        blocks in 0usize..40,
        seed in any::<u8>(),
    ) {
        let alg = CipherAlg::ALL[alg_index];
        let bs = alg.block_size();
        let plain: Vec<u8> = (0..blocks * bs).map(|i| (i as u8) ^ seed).collect();
        let iv = vec![seed; alg.iv_size()];

        let ctx = ctx();
        let sid = ctx.create_session(&SessionOp::cipher(alg, &key_for(alg))).unwrap();

        let enc = run(&ctx, &CryptRequest::encrypt(sid).with_iv(&iv).segment(Segment::cipher(&plain))).unwrap();
        prop_assert_eq!(enc.dst.len(), plain.len());
        prop_assert!(enc.mac.is_empty());
        if blocks > 0 {
            prop_assert_ne!(&enc.dst, &plain);
        }

        let dec = run(&ctx, &CryptRequest::decrypt(sid).with_iv(&iv).segment(Segment::cipher(&enc.dst))).unwrap();
        prop_assert_eq!(dec.dst, plain);
    }
}

#[test]
fn aes_matches_direct_transform() {
    let ctx = ctx();
    let sid = ctx.create_session(&SessionOp::cipher(CipherAlg::AesCbc, &AES_KEY)).unwrap();
    let plain = [0x42u8; 64];

    let out = run(&ctx, &CryptRequest::encrypt(sid).with_iv(&IV).segment(Segment::cipher(&plain))).unwrap();

    let mut expected = plain;
    let mut direct = SoftwareCipher::new(CipherAlg::AesCbc, &AES_KEY).unwrap();
    direct.set_iv(&IV).unwrap();
    direct.encrypt(&mut expected).unwrap();
    assert_eq!(out.dst, expected);
}

// ## 2️⃣ Hash always sees plaintext

#[test]
fn mac_is_over_plaintext_in_both_directions() {
    let ctx = ctx();
    let sid = aes_hmac_session(&ctx);
    let plain: Vec<u8> = (0..96u8).collect();
    let expected = hmac_sha256(MAC_KEY, &[&plain]);

    let enc = run(&ctx, &CryptRequest::encrypt(sid).with_iv(&IV).segment(Segment::both(&plain))).unwrap();
    assert_eq!(enc.mac, expected);

    let dec = run(&ctx, &CryptRequest::decrypt(sid).with_iv(&IV).segment(Segment::both(&enc.dst))).unwrap();
    assert_eq!(dec.dst, plain);
    assert_eq!(dec.mac, expected);
}

#[test]
fn hash_only_segment_is_authenticated_not_emitted() {
    let ctx = ctx();
    let sid = aes_hmac_session(&ctx);
    let header = b"associated header";
    let body = [0x33u8; 32];

    let req = CryptRequest::encrypt(sid)
        .with_iv(&IV)
        .segment(Segment::hash(header))
        .segment(Segment::both(&body));
    assert_eq!(req.output_len(), 32);

    let out = run(&ctx, &req).unwrap();
    assert_eq!(out.dst.len(), 32);
    assert_eq!(out.mac, hmac_sha256(MAC_KEY, &[header, &body]));
}

#[test]
fn cipher_only_segment_is_not_hashed() {
    let ctx = ctx();
    let sid = aes_hmac_session(&ctx);
    let skipped = [0x01u8; 16];
    let hashed = [0x02u8; 16];

    let out = run(
        &ctx,
        &CryptRequest::encrypt(sid)
            .with_iv(&IV)
            .segment(Segment::cipher(&skipped))
            .segment(Segment::both(&hashed)),
    )
    .unwrap();

    assert_eq!(out.dst.len(), 32);
    assert_eq!(out.mac, hmac_sha256(MAC_KEY, &[&hashed]));
}

#[test]
fn hash_restarts_every_call() {
    let ctx = ctx();
    let sid = ctx.create_session(&SessionOp::mac(HashAlg::Sha256, &[])).unwrap();

    for _ in 0..3 {
        let out = run(&ctx, &CryptRequest::encrypt(sid).segment(Segment::hash(b"abc"))).unwrap();
        assert!(out.dst.is_empty());
        assert_eq!(
            hex::encode(&out.mac),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}

// ## 3️⃣ Alignment and flag validation

#[test]
fn misaligned_segment_rejected_without_partial_output() {
    let ctx = ctx();
    let sid = aes_hmac_session(&ctx);
    let good = [0u8; 32];
    let bad = [0u8; 15];

    let mut out = CryptOutput::default();
    let err = ctx
        .cryptv(
            &CryptRequest::encrypt(sid)
                .with_iv(&IV)
                .segment(Segment::both(&good))
                .segment(Segment::both(&bad)),
            &mut out,
        )
        .unwrap_err();

    assert!(matches!(err, CryptodevError::Misaligned { segment: 1, len: 15, block_size: 16 }));
    assert_eq!(err.kind(), ErrorKind::Data);
    // Segment 0 went through; nothing of segment 1 did.
    assert_eq!(out.dst.len(), 32);
    assert!(out.mac.is_empty());
}

#[test]
fn misaligned_hash_only_segment_is_fine() {
    let ctx = ctx();
    let sid = aes_hmac_session(&ctx);
    let odd = [7u8; 13];

    let out = run(&ctx, &CryptRequest::encrypt(sid).segment(Segment::hash(&odd))).unwrap();
    assert!(out.dst.is_empty());
    assert_eq!(out.mac, hmac_sha256(MAC_KEY, &[&odd]));
}

#[test]
fn flags_must_match_session_transforms() {
    let ctx = ctx();
    let cipher_only = ctx.create_session(&SessionOp::cipher(CipherAlg::AesCbc, &AES_KEY)).unwrap();
    let hash_only = ctx.create_session(&SessionOp::mac(HashAlg::Sha1, &[])).unwrap();
    let data = [0u8; 16];

    let err = run(&ctx, &CryptRequest::encrypt(cipher_only).segment(Segment::hash(&data))).unwrap_err();
    assert!(matches!(err, CryptodevError::MissingHash { segment: 0 }));

    let err = run(&ctx, &CryptRequest::encrypt(hash_only).segment(Segment::cipher(&data))).unwrap_err();
    assert!(matches!(err, CryptodevError::MissingCipher { segment: 0 }));

    let err = run(
        &ctx,
        &CryptRequest::encrypt(hash_only).segment(Segment::new(&data, SegmentFlags::empty())),
    )
    .unwrap_err();
    assert!(matches!(err, CryptodevError::EmptySegmentFlags { segment: 0 }));
    assert_eq!(err.kind(), ErrorKind::Data);
}

#[test]
fn unknown_session_is_lookup_error() {
    let ctx = ctx();
    let err = run(&ctx, &CryptRequest::encrypt(0x1234_5678).segment(Segment::both(&[0u8; 16]))).unwrap_err();
    assert!(matches!(err, CryptodevError::SessionNotFound(0x1234_5678)));
    assert_eq!(err.kind(), ErrorKind::Lookup);
}

// ## 4️⃣ IV handling

#[test]
fn iv_continues_across_calls() {
    let ctx = ctx();
    let sid = ctx.create_session(&SessionOp::cipher(CipherAlg::AesCbc, &AES_KEY)).unwrap();
    let plain: Vec<u8> = (0..64u8).collect();

    let whole = run(&ctx, &CryptRequest::encrypt(sid).with_iv(&IV).segment(Segment::cipher(&plain))).unwrap();

    let first = run(&ctx, &CryptRequest::encrypt(sid).with_iv(&IV).segment(Segment::cipher(&plain[..32]))).unwrap();
    let second = run(&ctx, &CryptRequest::encrypt(sid).segment(Segment::cipher(&plain[32..]))).unwrap();

    assert_eq!([first.dst, second.dst].concat(), whole.dst);
}

#[test]
fn supplied_iv_overrides_chain() {
    let ctx = ctx();
    let sid = ctx.create_session(&SessionOp::cipher(CipherAlg::AesCbc, &AES_KEY)).unwrap();
    let block = [0x55u8; 16];

    let a = run(&ctx, &CryptRequest::encrypt(sid).with_iv(&IV).segment(Segment::cipher(&block))).unwrap();
    let b = run(&ctx, &CryptRequest::encrypt(sid).with_iv(&IV).segment(Segment::cipher(&block))).unwrap();
    let chained = run(&ctx, &CryptRequest::encrypt(sid).segment(Segment::cipher(&block))).unwrap();

    assert_eq!(a.dst, b.dst);
    assert_ne!(b.dst, chained.dst);
}

#[test]
fn wrong_iv_length_rejected() {
    let ctx = ctx();
    let sid = ctx.create_session(&SessionOp::cipher(CipherAlg::AesCbc, &AES_KEY)).unwrap();
    let err = run(&ctx, &CryptRequest::encrypt(sid).with_iv(&[0u8; 8]).segment(Segment::cipher(&[0u8; 16])))
        .unwrap_err();
    assert!(matches!(err, CryptodevError::InvalidIv { expected: 16, actual: 8 }));
}

#[test]
fn iv_ignored_without_cipher() {
    let ctx = ctx();
    let sid = ctx.create_session(&SessionOp::mac(HashAlg::Sha256, &[])).unwrap();
    let out = run(&ctx, &CryptRequest::encrypt(sid).with_iv(&[1, 2, 3]).segment(Segment::hash(b"abc"))).unwrap();
    assert_eq!(out.mac.len(), 32);
    assert_eq!(out.mac, Sha256::digest(b"abc").to_vec());
}

// ## 5️⃣ Staging size does not change results

#[test]
fn small_staging_buffer_gives_same_output() {
    let small = CryptoDevice::new(
        Arc::new(SoftwareProvider),
        EngineConfig { staging_size: 16, ..EngineConfig::default() },
    )
    .unwrap()
    .open();
    let large = ctx();

    let plain: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let plain = &plain[..plain.len() - plain.len() % 16];

    let mut outs = Vec::new();
    for ctx in [&small, &large] {
        let sid = aes_hmac_session(ctx);
        outs.push(run(ctx, &CryptRequest::encrypt(sid).with_iv(&IV).segment(Segment::both(plain))).unwrap());
    }
    assert_eq!(outs[0], outs[1]);
    assert_eq!(outs[0].mac, hmac_sha256(MAC_KEY, &[plain]));
}

// ## 6️⃣ Three-segment scenario

#[test]
fn three_segment_encrypt_scenario() {
    let ctx = ctx();
    let sid = aes_hmac_session(&ctx);
    let s0 = [0xA0u8; 16];
    let s1 = [0xB1u8; 48];
    let s2 = [0xC2u8; 32];

    let req = CryptRequest::encrypt(sid)
        .with_iv(&IV)
        .segment(Segment::both(&s0))
        .segment(Segment::both(&s1))
        .segment(Segment::both(&s2));
    let out = run(&ctx, &req).unwrap();

    assert_eq!(out.dst.len(), 16 + 48 + 32);
    assert_eq!(out.mac, hmac_sha256(MAC_KEY, &[&s0, &s1, &s2]));

    let stats = ctx.session_stats(sid).unwrap();
    assert_eq!(stats.bytes_encrypted, 96);
    assert_eq!(stats.bytes_decrypted, 0);
    assert_eq!(stats.max_request, 48);
    assert_eq!(stats.op_count, 3);
    assert_eq!(stats.avg_request, 32);

    // Decrypt it back segment by segment through one request.
    let (c0, rest) = out.dst.split_at(16);
    let (c1, c2) = rest.split_at(48);
    let back = run(
        &ctx,
        &CryptRequest::decrypt(sid)
            .with_iv(&IV)
            .segment(Segment::both(c0))
            .segment(Segment::both(c1))
            .segment(Segment::both(c2)),
    )
    .unwrap();
    assert_eq!(back.dst, [&s0[..], &s1[..], &s2[..]].concat());
    assert_eq!(back.mac, out.mac);
    assert_eq!(ctx.session_stats(sid).unwrap().bytes_decrypted, 96);
}

#[test]
fn stats_off_leaves_counters_zero() {
    let ctx = CryptoDevice::new(
        Arc::new(SoftwareProvider),
        EngineConfig { collect_stats: false, ..EngineConfig::default() },
    )
    .unwrap()
    .open();
    let sid = aes_hmac_session(&ctx);
    run(&ctx, &CryptRequest::encrypt(sid).with_iv(&IV).segment(Segment::both(&[0u8; 32]))).unwrap();
    assert_eq!(ctx.session_stats(sid).unwrap().op_count, 0);
}

// ## 7️⃣ Block sizes that do not divide the staging size

/// XOR "cipher" with 24-byte blocks; rejects partial blocks like a real one.
struct WideBlockCipher {
    key: u8,
}

impl WideBlockCipher {
    fn apply(&self, buf: &mut [u8]) -> Result<(), CryptoError> {
        if buf.len() % 24 != 0 {
            return Err(CryptoError::Misaligned { len: buf.len(), block_size: 24 });
        }
        buf.iter_mut().for_each(|b| *b ^= self.key);
        Ok(())
    }
}

impl CipherHandle for WideBlockCipher {
    fn alg(&self) -> CipherAlg {
        CipherAlg::TdesCbc
    }
    fn block_size(&self) -> usize {
        24
    }
    fn iv_size(&self) -> usize {
        24
    }
    fn set_iv(&mut self, _iv: &[u8]) -> Result<(), CryptoError> {
        Ok(())
    }
    fn encrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        self.apply(buf)
    }
    fn decrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        self.apply(buf)
    }
}

struct WideBlockProvider;

impl TransformProvider for WideBlockProvider {
    fn cipher_key_bounds(&self, _alg: CipherAlg) -> Result<KeyBounds, CryptoError> {
        Ok(KeyBounds::exact(1))
    }

    fn hash_key_bounds(&self, alg: HashAlg) -> Result<KeyBounds, CryptoError> {
        SoftwareProvider.hash_key_bounds(alg)
    }

    fn alloc_cipher(&self, _alg: CipherAlg, key: &[u8]) -> Result<Box<dyn CipherHandle>, CryptoError> {
        Ok(Box::new(WideBlockCipher { key: key[0] }))
    }

    fn alloc_hash(&self, alg: HashAlg, key: &[u8]) -> Result<Box<dyn HashHandle>, CryptoError> {
        SoftwareProvider.alloc_hash(alg, key)
    }
}

#[test]
fn chunks_stay_on_cipher_block_boundaries() {
    // 171 blocks of 24 is just past one page; no power-of-two chunk is a
    // whole number of blocks.
    let plain: Vec<u8> = (0..24 * 171).map(|i| (i % 253) as u8).collect();
    let expected: Vec<u8> = plain.iter().map(|b| b ^ 0x5a).collect();

    for staging_size in [4096, 64, 16] {
        let ctx = CryptoDevice::new(
            Arc::new(WideBlockProvider),
            EngineConfig { staging_size, ..EngineConfig::default() },
        )
        .unwrap()
        .open();
        let op = SessionOp::cipher(CipherAlg::TdesCbc, &[0x5a]).with_mac(HashAlg::HmacSha256, MAC_KEY);
        let sid = ctx.create_session(&op).unwrap();

        let out = run(&ctx, &CryptRequest::encrypt(sid).segment(Segment::both(&plain)))
            .unwrap_or_else(|e| panic!("staging_size={}: {}", staging_size, e));
        assert_eq!(out.dst, expected, "staging_size={}", staging_size);
        assert_eq!(out.mac, hmac_sha256(MAC_KEY, &[&plain]));

        // Hash-only segments are not bound to the cipher block.
        let out = run(&ctx, &CryptRequest::encrypt(sid).segment(Segment::hash(&plain[..1001]))).unwrap();
        assert_eq!(out.mac, hmac_sha256(MAC_KEY, &[&plain[..1001]]));
    }
}
