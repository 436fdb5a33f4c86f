use serde::Serialize;

use crate::fields::Fields;

/// One connection from a `CLIENT LIST` report. All values stay strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClientRecord {
    fields: Fields,
}

impl ClientRecord {
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn get(&self, attr: &str) -> Option<&str> {
        self.fields.get(attr)
    }

    pub fn id(&self) -> Option<&str> {
        self.get("id")
    }

    pub fn addr(&self) -> Option<&str> {
        self.get("addr")
    }

    pub fn idle_seconds(&self) -> Option<u64> {
        self.numeric("idle")
    }

    pub fn age_seconds(&self) -> Option<u64> {
        self.numeric("age")
    }

    /// Memory used by the output buffer (`omem`).
    pub fn output_memory_bytes(&self) -> Option<u64> {
        self.numeric("omem")
    }

    fn numeric(&self, attr: &str) -> Option<u64> {
        self.get(attr).and_then(|v| v.parse().ok())
    }
}

impl From<Fields> for ClientRecord {
    fn from(fields: Fields) -> Self {
        Self { fields }
    }
}

/// Parse the text returned by `CLIENT LIST`, one record per non-blank line.
///
/// Tokens are split on their first `=`. A token missing the `=`, the name or
/// the value is skipped.
pub fn parse_client_list(text: &str) -> Vec<ClientRecord> {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(parse_client_line)
        .collect()
}

fn parse_client_line(line: &str) -> ClientRecord {
    line.split(' ')
        .filter_map(|token| token.split_once('='))
        .filter(|(attr, value)| !attr.is_empty() && !value.is_empty())
        .collect::<Fields>()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_line() {
        let clients = parse_client_list("id=3 addr=127.0.0.1:5 age=10\n");

        assert_eq!(clients.len(), 1);
        let client = &clients[0];
        assert_eq!(client.id(), Some("3"));
        assert_eq!(client.addr(), Some("127.0.0.1:5"));
        assert_eq!(client.get("age"), Some("10"));
        assert_eq!(client.fields().len(), 3);
    }

    #[test]
    fn test_token_without_value_dropped() {
        let clients = parse_client_list("id=3 foo name= =orphan cmd=client|list");

        let client = &clients[0];
        let attrs: Vec<&str> = client.fields().iter().map(|(a, _)| a).collect();
        assert_eq!(attrs, vec!["id", "cmd"]);
        assert_eq!(client.get("name"), None);
    }

    #[test]
    fn test_value_split_on_first_equals() {
        let clients = parse_client_list("id=1 lib-name=a=b");
        assert_eq!(clients[0].get("lib-name"), Some("a=b"));
    }

    #[test]
    fn test_blank_lines_and_order() {
        let text = "id=7 addr=10.0.0.1:1\n\n   \nid=2 addr=10.0.0.2:2\nid=9 addr=10.0.0.3:3\n";
        let clients = parse_client_list(text);
        let ids: Vec<&str> = clients.iter().filter_map(|c| c.id()).collect();
        assert_eq!(ids, vec!["7", "2", "9"]);
    }

    #[test]
    fn test_numeric_views() {
        let clients = parse_client_list("id=1 idle=90 age=3661 omem=1536 qbuf=abc");
        let client = &clients[0];
        assert_eq!(client.idle_seconds(), Some(90));
        assert_eq!(client.age_seconds(), Some(3661));
        assert_eq!(client.output_memory_bytes(), Some(1536));
        assert_eq!(client.get("qbuf"), Some("abc"));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_client_list("").is_empty());
        assert!(parse_client_list("\n\n").is_empty());
    }
}
