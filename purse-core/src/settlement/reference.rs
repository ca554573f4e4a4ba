//! Internal reference generation.
//!
//! `DEP_<8 hex>_<unix seconds>` for deposits and
//! `TXF_<8 hex>_<unix seconds>_{DEBIT,CREDIT}` for the two legs of a transfer.
//! The random segment keeps references unique when one user issues several
//! operations within the same second.

use time::OffsetDateTime;
use uuid::Uuid;

const DEPOSIT_PREFIX: &str = "DEP";
const TRANSFER_PREFIX: &str = "TXF";

fn random_segment() -> String {
    let mut simple = Uuid::new_v4().simple().to_string();
    simple.truncate(8);
    simple
}

fn stem(prefix: &str) -> String {
    format!(
        "{prefix}_{}_{}",
        random_segment(),
        OffsetDateTime::now_utc().unix_timestamp()
    )
}

pub fn deposit_reference() -> String {
    stem(DEPOSIT_PREFIX)
}

/// References for a transfer's debit and credit legs. They share one stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReferences {
    pub debit: String,
    pub credit: String,
}

pub fn transfer_references() -> TransferReferences {
    let stem = stem(TRANSFER_PREFIX);
    TransferReferences {
        debit: format!("{stem}_DEBIT"),
        credit: format!("{stem}_CREDIT"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_deposit_reference_shape() {
        let reference = deposit_reference();
        let parts: Vec<&str> = reference.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "DEP");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(parts[2].parse::<i64>().is_ok());
    }

    #[test]
    fn test_transfer_legs_share_stem() {
        let refs = transfer_references();
        let debit_stem = refs.debit.strip_suffix("_DEBIT").unwrap();
        let credit_stem = refs.credit.strip_suffix("_CREDIT").unwrap();
        assert_eq!(debit_stem, credit_stem);
        assert!(debit_stem.starts_with("TXF_"));
    }

    #[test]
    fn test_references_do_not_collide_within_a_second() {
        let refs: HashSet<String> = (0..200).map(|_| deposit_reference()).collect();
        assert_eq!(refs.len(), 200);
    }
}
