pub use kernel::id::SessionId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_parses_from_claim_string() {
        let id = SessionId::new();
        assert_eq!(SessionId::parse_str(&id.to_string()).unwrap(), id);
    }
}
