//! Checks against checkpoints, signed tree heads and keys published by
//! deployed logs and witnesses, so that the signature formats stay
//! compatible with other implementations.
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use tlog_witness::cosig::{cosignature_v1_timestamp, CosignatureV1Signer, CosignatureV1Verifier};
use tlog_witness::ed25519::new_verifier;
use tlog_witness::note;
use tlog_witness::proof::TLogProof;
use tlog_witness::rfc6962::{
    rfc6962_sth_to_checkpoint, rfc6962_verifier_string, LogPublicKey, Rfc6962Verifier,
};
use tlog_witness::traits::{Signer, Verifier};
use tlog_witness::WitnessGroup;

const ROME_URL: &str = "https://rome.ct.filippo.io/2024h1/";
const ROME_DER: &str = "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEAXM8Ld9qn64g1zVFDh5FtgxS3zj5sqQDwYMs3wrBV3MCBiFhK/iRLxdKF4YsAcJaEglMlu4Lewvzxs0xO2uwEw==";
const ROME_VKEY: &str = "rome.ct.filippo.io/2024h1+78f4abae+BTBZMBMGByqGSM49AgEGCCqGSM49AwEHA0IABAFzPC3fap+uINc1RQ4eRbYMUt84+bKkA8GDLN8KwVdzAgYhYSv4kS8XSheGLAHCWhIJTJbuC3sL88bNMTtrsBM=";
const ROME_CP: &str = "rome.ct.filippo.io/2024h1\n115474666\n2q1K6aiIJR+F7TyhiWOghoWOjY0/3dVBLsBbAvB4xCw=\n\n\u{2014} rome.ct.filippo.io/2024h1 ePSrrgAAAY5+gVlSBAMARzBFAiEAv8bOMzo3Ed/GbU9fzzJvaStX6i8xTsmEF+NqvpGhIO0CIEn1X+zzVEerdix64GEn97XCXObA2G5JQ8UDDqCKdG5m\n";

const ARGON_URL: &str = "https://ct.googleapis.com/logs/us1/argon2024/";
const ARGON_DER: &str = "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEHblsqctplMVc5ramA7vSuNxUQxcomQwGAVAdnWTAWUYr3MgDHQW0LagJ95lB7QT75Ve6JgT2EVLOFGU7L3YrwA==";
const ARGON_STH: &str = r#"{"tree_size":1267285836,"timestamp":1711642477482,"sha256_root_hash":"SHySaYoaGIV5oCMANTytRfUjfzXb7wvO9xQiGkDJlfQ=","tree_head_signature":"BAMARzBFAiAQWbsL/MbJdeR4jk8xYKWDBDGHyDcntBim9Jr1BvwPnAIhAMedQo0YuBo+ajNd9xyVOMvhOdVAeJYgOhBLQn8rca94"}"#;
const ARGON_CP: &str = "ct.googleapis.com/logs/us1/argon2024\n1267285836\nSHySaYoaGIV5oCMANTytRfUjfzXb7wvO9xQiGkDJlfQ=\n\n\u{2014} ct.googleapis.com/logs/us1/argon2024 fetJ0AAAAY6F14OqBAMARzBFAiAQWbsL/MbJdeR4jk8xYKWDBDGHyDcntBim9Jr1BvwPnAIhAMedQo0YuBo+ajNd9xyVOMvhOdVAeJYgOhBLQn8rca94\n";

const WIT1_VKEY: &str = "Wit1+55ee4561+AVhZSmQj9+SoL+p/nN0Hh76xXmF7QcHfytUrI1XfSClk";
const WIT1_SKEY: &str = "PRIVATE+KEY+Wit1+55ee4561+AeadRiG7XM4XiieCHzD8lxysXMwcViy5nYsoXURWGrlE";
const WIT2_SKEY: &str = "PRIVATE+KEY+Wit2+85ecc407+AfPTvxw5eUcqSgivo2vaiC7JPOMUZ/9baHPSDrWqgdGm";
const WIT3_SKEY: &str = "PRIVATE+KEY+Wit3+d3ed3be7+AR2Kg8k6ccBr5QXz5SHtnkOS4UGQGEQaWi6Gfr6Mm3X5";

fn log_key(der: &str) -> LogPublicKey {
    LogPublicKey::from_der(&B64.decode(der).unwrap()).unwrap()
}

#[test]
fn static_ct_verifier_string() {
    assert_eq!(
        rfc6962_verifier_string(ROME_URL, &log_key(ROME_DER)).unwrap(),
        ROME_VKEY
    );
}

#[test]
fn static_ct_checkpoint() {
    let v = new_verifier(ROME_VKEY).unwrap();
    let n = note::open(ROME_CP.as_bytes(), &[v.as_ref()]).unwrap();
    assert_eq!(n.sigs.len(), 1);
    assert_eq!(n.sigs[0].hash, 0x78f4abae);

    let borked = format!("B0rked{ROME_CP}");
    assert!(note::open(borked.as_bytes(), &[v.as_ref()]).is_err());
}

#[test]
fn signed_tree_head_to_checkpoint() {
    let vkey = rfc6962_verifier_string(ARGON_URL, &log_key(ARGON_DER)).unwrap();
    let v = Rfc6962Verifier::new(&vkey).unwrap();

    let cp = rfc6962_sth_to_checkpoint(ARGON_STH.as_bytes(), &v).unwrap();
    assert_eq!(String::from_utf8(cp.clone()).unwrap(), ARGON_CP);
    assert!(note::open(&cp, &[&v]).is_ok());
}

#[test]
fn rfc6962_checkpoint_in_proof() {
    let proof = TLogProof {
        index: 1267285835,
        hashes: vec![[0xab; 32]],
        checkpoint: ARGON_CP.as_bytes().to_vec(),
        extra_data: None,
    };
    let decoded = TLogProof::unmarshal(&proof.marshal()).unwrap();
    assert_eq!(decoded, proof);

    let v = new_verifier(
        &rfc6962_verifier_string(ARGON_URL, &log_key(ARGON_DER)).unwrap(),
    )
    .unwrap();
    assert!(note::open(&decoded.checkpoint, &[v.as_ref()]).is_ok());
}

#[test]
fn published_witness_key() {
    let v = CosignatureV1Verifier::new(WIT1_VKEY).unwrap();
    let s = CosignatureV1Signer::new(WIT1_SKEY).unwrap();
    assert_eq!(v.name(), "Wit1");
    assert_eq!(v.key_hash(), s.key_hash());

    let text = "example.com/log\n7\nf+7CoKgXKE/tNys9TTXcr/ad6U/K3xvznmzew9y6SP0=\n";
    let cp = note::sign(text, &[&s]).unwrap();
    let n = note::open(&cp, &[&v]).unwrap();
    assert!(cosignature_v1_timestamp(&n.sigs[0]).is_ok());
}

#[test]
fn policy_end_to_end() {
    let policy = "
# wit1 is always required, together with either of the other two.
witness wit1 Wit1+55ee4561+AVhZSmQj9+SoL+p/nN0Hh76xXmF7QcHfytUrI1XfSClk https://b1.example.com/wit1prefix
witness wit2 Wit2+85ecc407+AWVbwFJte9wMQIPSnEnj4KibeO6vSIOEDUTDp3o63c2x https://b1.example.com/wit2prefix
witness wit3 Wit3+d3ed3be7+ASb6Uz1+fxAcXkMvDd7nGa3FjDce7LxIKmbbTCT0MpVn https://witness.example.com/
group operator any wit2 wit3
group root all wit1 operator
quorum root
";
    let group = WitnessGroup::from_policy(policy).unwrap();
    let urls: Vec<String> = group.endpoints().keys().map(|u| u.to_string()).collect();
    assert_eq!(
        urls,
        [
            "https://b1.example.com/wit1prefix/add-checkpoint",
            "https://b1.example.com/wit2prefix/add-checkpoint",
            "https://witness.example.com/add-checkpoint",
        ]
    );

    let text = "example.com/log\n7\nf+7CoKgXKE/tNys9TTXcr/ad6U/K3xvznmzew9y6SP0=\n";
    let sign = |skeys: &[&str]| {
        let signers: Vec<CosignatureV1Signer> = skeys
            .iter()
            .map(|k| CosignatureV1Signer::new(k).unwrap())
            .collect();
        let signers: Vec<&dyn Signer> = signers.iter().map(|s| s as &dyn Signer).collect();
        note::sign(text, &signers).unwrap()
    };

    assert!(group.satisfied(&sign(&[WIT1_SKEY, WIT3_SKEY])));
    assert!(group.satisfied(&sign(&[WIT2_SKEY, WIT1_SKEY])));
    assert!(!group.satisfied(&sign(&[WIT2_SKEY, WIT3_SKEY])));
    assert!(!group.satisfied(&sign(&[WIT1_SKEY])));
}
