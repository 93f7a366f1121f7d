//! Extraction prompt construction.

/// Build the obligation-extraction prompt for one contract, scoped to the
/// obligations binding the given party.
pub fn build_extraction_prompt(party: &str) -> String {
    format!(
        "You are a contract manager reviewing the attached contract document. \
Identify every obligation that the party \"{party}\" must fulfil under this \
contract: payments, deliveries, notices, deadlines, renewals, and any other \
duty the text imposes on them.\n\n\
Respond with a JSON array only, no prose before or after. Each element must \
be an object with these fields:\n\
- \"text\": the obligation, stated in one clear sentence (required)\n\
- \"section\": the clause or section reference where it appears, or null\n\
- \"due_date\": the deadline in YYYY-MM-DD format if one is stated, or null\n\n\
If the document contains no obligations for \"{party}\", respond with an \
empty JSON array: []."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_party() {
        let prompt = build_extraction_prompt("Acme Corp");
        assert!(prompt.contains("\"Acme Corp\""));
    }

    #[test]
    fn prompt_demands_json_array() {
        let prompt = build_extraction_prompt("Tenant");
        assert!(prompt.contains("JSON array"));
        assert!(prompt.contains("\"text\""));
        assert!(prompt.contains("\"section\""));
        assert!(prompt.contains("\"due_date\""));
    }
}
