use crate::transaction::Transaction;
use ferrous_dns_audit_domain::DomainError;
use hickory_proto::op::Message;
use std::fmt::Display;

fn line(tx: &Transaction, item: impl Display) -> Vec<u8> {
    format!(
        "{} {} {} {} {}",
        tx.timestamp_text(),
        tx.proto(),
        tx.local,
        tx.remote,
        item
    )
    .into_bytes()
}

pub(super) fn encode(tx: &Transaction) -> Vec<Vec<u8>> {
    tx.pairs()
        .map(|(question, answer)| match answer {
            Some(record) => line(tx, record),
            None => line(tx, question),
        })
        .collect()
}

pub(super) fn encode_error(tx: &Transaction, request: &Message, err: &DomainError) -> Vec<Vec<u8>> {
    request
        .queries()
        .iter()
        .map(|question| line(tx, format_args!("{} ERROR {}", question, err)))
        .collect()
}
