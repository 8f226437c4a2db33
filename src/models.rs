use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meme {
    pub id: String,
    pub title: String,
    /// Remote URL or an embedded `data:` URL.
    pub image: String,
    /// Id of the category the meme was filed under.
    pub category: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: i64,
    pub likes: u64,
    #[serde(default)]
    pub donations: f64,
}

/// Fields a user supplies when posting a meme.
#[derive(Debug, Clone, Default)]
pub struct NewMeme {
    pub title: String,
    pub image: String,
    pub category: String,
    pub author: String,
    pub author_id: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

/// A category together with how many memes are filed under it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    #[serde(flatten)]
    pub category: Category,
    pub meme_count: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
}

impl SocialLinks {
    /// Trims every link and drops the blank ones.
    pub fn normalized(self) -> Self {
        SocialLinks {
            telegram: non_blank(self.telegram),
            vk: non_blank(self.vk),
            youtube: non_blank(self.youtube),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub links: SocialLinks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    pub created_at: i64,
}

/// Partial update of a profile.
///
/// Absent fields are left untouched. A present but blank string clears the
/// corresponding optional field. `links` replaces the whole link set.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub links: Option<SocialLinks>,
    #[serde(default)]
    pub card_number: Option<String>,
}

impl ProfilePatch {
    pub fn apply(self, profile: &mut Profile) {
        if let Some(avatar) = self.avatar {
            profile.avatar = non_blank(Some(avatar));
        }
        if let Some(links) = self.links {
            profile.links = links.normalized();
        }
        if let Some(card_number) = self.card_number {
            profile.card_number = non_blank(Some(card_number));
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            id: "1".into(),
            username: "vasya".into(),
            avatar: Some("https://img/a.png".into()),
            links: SocialLinks {
                telegram: Some("https://t.me/vasya".into()),
                ..Default::default()
            },
            card_number: Some("1234".into()),
            created_at: 1,
        }
    }

    #[test]
    fn patch_leaves_absent_fields_alone() {
        let mut p = profile();
        ProfilePatch {
            card_number: Some(" 5555 ".into()),
            ..Default::default()
        }
        .apply(&mut p);

        assert_eq!(p.card_number.as_deref(), Some("5555"));
        assert_eq!(p.avatar.as_deref(), Some("https://img/a.png"));
        assert_eq!(p.links.telegram.as_deref(), Some("https://t.me/vasya"));
    }

    #[test]
    fn blank_patch_values_clear_fields() {
        let mut p = profile();
        ProfilePatch {
            card_number: Some("   ".into()),
            links: Some(SocialLinks {
                vk: Some("https://vk.com/vasya".into()),
                youtube: Some("".into()),
                ..Default::default()
            }),
            ..Default::default()
        }
        .apply(&mut p);

        assert_eq!(p.card_number, None);
        assert_eq!(p.links.telegram, None);
        assert_eq!(p.links.vk.as_deref(), Some("https://vk.com/vasya"));
        assert_eq!(p.links.youtube, None);
    }

    #[test]
    fn meme_reads_records_without_newer_fields() {
        let raw = r#"{"id":"1","title":"t","image":"u","category":"random","author":"a","createdAt":5,"likes":2}"#;
        let meme: Meme = serde_json::from_str(raw).unwrap();
        assert_eq!(meme.donations, 0.0);
        assert_eq!(meme.description, None);
        assert_eq!(meme.author_id, None);
    }

    #[test]
    fn meme_serializes_camel_case() {
        let meme = Meme {
            id: "1".into(),
            title: "t".into(),
            image: "u".into(),
            category: "random".into(),
            author: "a".into(),
            author_id: Some("9".into()),
            description: None,
            created_at: 5,
            likes: 0,
            donations: 0.0,
        };
        let value = serde_json::to_value(&meme).unwrap();
        assert_eq!(value["authorId"], "9");
        assert_eq!(value["createdAt"], 5);
        assert!(value.get("description").is_none());
    }
}
