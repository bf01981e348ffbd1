use serde::{Deserialize, Serialize};

/// One entry of the portal's schema list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaOption {
    pub schema: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaRequest<'a> {
    pub schema: &'a str,
}

/// Display settings of a schema: titles and canned replies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaDetail {
    pub name: String,
    pub title: String,
    pub welcome: String,
    pub subservice: String,
    pub option: String,
    pub am: String,
    pub pm: String,
    pub cancel: String,
    pub cancel_info: String,
    pub cancel_success: String,
    pub back: String,
    pub back_info: String,
    pub back_success: String,
    pub other: String,
    #[serde(rename = "unkown", alias = "unknown")]
    pub unknown: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detail_with_server_spelling() {
        let json = r#"{"name":"loan","title":"Loans","welcome":"Hi","unkown":"Sorry?"}"#;
        let detail: SchemaDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.title, "Loans");
        assert_eq!(detail.unknown, "Sorry?");
        assert_eq!(detail.back_info, "");
    }

    #[test]
    fn test_empty_detail_for_unknown_schema() {
        // The server answers `{}` for a schema it does not know
        let detail: SchemaDetail = serde_json::from_str("{}").unwrap();
        assert_eq!(detail, SchemaDetail::default());
    }
}
