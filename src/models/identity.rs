use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable-attribute bundle for an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub mid: i64,
    pub name: String,
    pub sex: String,
    pub avatar_url: String,
    pub sign: String,
    pub level: i64,
    pub vip_type: i64,
    pub official_role: i64,
    pub official_title: String,
    pub is_banned: bool,
    pub school: String,
    pub birthday: String,
    pub is_senior_member: bool,
}

impl Identity {
    /// Builds an `Identity` from the identity endpoint's response body.
    /// Returns `None` if a required field is missing or the wrong type.
    pub fn from_json(mid: i64, data: &Value) -> Option<Self> {
        Some(Self {
            mid,
            name: data.get("name")?.as_str()?.to_string(),
            sex: str_field(data, "sex"),
            avatar_url: str_field(data, "face"),
            sign: str_field(data, "sign"),
            level: int_field(data, "level"),
            vip_type: data
                .get("vip")
                .and_then(|v| v.get("type"))
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
            official_role: data
                .get("official")
                .and_then(|v| v.get("role"))
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
            official_title: data
                .get("official")
                .and_then(|v| v.get("title"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            is_banned: int_field(data, "silence") != 0,
            school: data
                .get("school")
                .and_then(|v| v.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            birthday: str_field(data, "birthday"),
            is_senior_member: int_field(data, "is_senior_member") != 0,
        })
    }
}

fn str_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn int_field(data: &Value, key: &str) -> i64 {
    data.get(key).and_then(|v| v.as_i64()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_from_full_json() {
        let data = json!({
            "name": "zaxtyson",
            "sex": "男",
            "face": "http://example.com/a.jpg",
            "sign": "hi",
            "level": 6,
            "vip": {"type": 2},
            "official": {"role": 0, "title": ""},
            "silence": 0,
            "school": {"name": "XJTU"},
            "birthday": "01-01",
            "is_senior_member": 1,
        });

        let identity = Identity::from_json(10086, &data).unwrap();
        assert_eq!(identity.mid, 10086);
        assert_eq!(identity.name, "zaxtyson");
        assert_eq!(identity.vip_type, 2);
        assert!(identity.is_senior_member);
        assert!(!identity.is_banned);
        assert_eq!(identity.school, "XJTU");
    }

    #[test]
    fn test_identity_missing_school_defaults_unknown() {
        let data = json!({
            "name": "nobody",
            "school": null,
        });
        let identity = Identity::from_json(1, &data).unwrap();
        assert_eq!(identity.school, "unknown");
    }

    #[test]
    fn test_identity_missing_name_is_none() {
        let data = json!({"sex": "男"});
        assert!(Identity::from_json(1, &data).is_none());
    }
}
