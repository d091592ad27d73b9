pub use kernel::id::UserId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_survives_claim_round_trip() {
        let id = UserId::new();
        let claim = id.to_string();
        assert_eq!(UserId::parse_str(&claim).unwrap(), id);
        assert!(UserId::parse_str("not-a-uuid").is_err());
    }
}
