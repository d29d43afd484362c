//! normalize → encode → decode reproduces every field of the chain event.

use alloy::primitives::{Address, B256, U256};
use tip_relay::events::{normalize, RawEvent};
use tip_relay::schema::{NormalizedRecord, SchemaEncoder};

mod common;

use common::{profile_created_event, profile_updated_event, tip_event};

fn round_trip(event: RawEvent) -> (NormalizedRecord, NormalizedRecord) {
    let record = normalize(event).unwrap();
    let encoder = SchemaEncoder::new();
    let payload = encoder.encode(&record);
    let decoded = encoder.decode(payload.kind, &payload.data).unwrap();
    (record, decoded)
}

#[test]
fn test_tip_round_trip() {
    let RawEvent::TipSent(raw) = tip_event(42) else {
        unreachable!()
    };
    let (record, decoded) = round_trip(RawEvent::TipSent(raw.clone()));
    assert_eq!(decoded, record);

    let NormalizedRecord::Tip(tip) = decoded else {
        panic!("expected tip record");
    };
    assert_eq!(U256::from(tip.id), raw.tip_id);
    assert_eq!(tip.fromAddress, Address::from_slice(&raw.from));
    assert_eq!(tip.toAddress, Address::from_slice(&raw.to));
    assert_eq!(tip.fromUsername, raw.from_username);
    assert_eq!(tip.toUsername, raw.to_username);
    assert_eq!(tip.amount, raw.amount);
    assert_eq!(tip.platformFee, raw.platform_fee);
    assert_eq!(Some(tip.recipientAmount), raw.recipient_amount);
    assert_eq!(tip.message, raw.message);
    assert_eq!(Some(tip.timestamp), raw.meta.block_timestamp);
    assert_eq!(tip.txHash, B256::from_slice(raw.meta.tx_hash.as_ref().unwrap()));
}

#[test]
fn test_profile_created_round_trip() {
    let RawEvent::ProfileCreated(raw) = profile_created_event(7) else {
        unreachable!()
    };
    let (record, decoded) = round_trip(RawEvent::ProfileCreated(raw.clone()));
    assert_eq!(decoded, record);

    let NormalizedRecord::ProfileCreated(profile) = decoded else {
        panic!("expected profile-created record");
    };
    assert_eq!(profile.userAddress, Address::from_slice(&raw.user));
    assert_eq!(profile.username, raw.username);
    assert_eq!(profile.creditScore, raw.credit_score);
    assert_eq!(Some(profile.timestamp), raw.meta.block_timestamp);
}

#[test]
fn test_profile_updated_round_trip() {
    let RawEvent::ProfileUpdated(raw) = profile_updated_event(9) else {
        unreachable!()
    };
    let (record, decoded) = round_trip(RawEvent::ProfileUpdated(raw.clone()));
    assert_eq!(decoded, record);

    let NormalizedRecord::ProfileUpdated(profile) = decoded else {
        panic!("expected profile-updated record");
    };
    assert_eq!(profile.userAddress, Address::from_slice(&raw.user));
    assert_eq!(profile.profileImageRef, raw.profile_image);
    assert_eq!(profile.txHash, B256::from_slice(raw.meta.tx_hash.as_ref().unwrap()));
}

#[test]
fn test_unicode_and_empty_strings_survive() {
    let RawEvent::TipSent(mut raw) = tip_event(1) else {
        unreachable!()
    };
    raw.message = "merci 🙏 ありがとう".into();
    raw.to_username = String::new();
    let (record, decoded) = round_trip(RawEvent::TipSent(raw));
    assert_eq!(decoded, record);
}
