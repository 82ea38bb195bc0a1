use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::players::casefold;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Area {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

#[async_trait]
/// Read access to the host's area registry.
pub trait AreaRegistry: Send + Sync {
    async fn areas(&self) -> Vec<Area>;
}

/// Looks an area up by id, then by name, then by alias (case-insensitive).
pub fn find_area<'a>(areas: &'a [Area], requested: &str) -> Option<&'a Area> {
    let wanted = casefold(requested);
    areas
        .iter()
        .find(|area| area.id == requested)
        .or_else(|| areas.iter().find(|area| casefold(&area.name) == wanted))
        .or_else(|| {
            areas
                .iter()
                .find(|area| area.aliases.iter().any(|alias| casefold(alias) == wanted))
        })
}

#[cfg(test)]
mod tests {
    use super::{find_area, Area};

    fn areas() -> Vec<Area> {
        vec![
            Area {
                id: "living_room".to_string(),
                name: "Living Room".to_string(),
                aliases: vec!["Lounge".to_string()],
            },
            Area {
                id: "kitchen".to_string(),
                name: "Kitchen".to_string(),
                aliases: Vec::new(),
            },
        ]
    }

    #[test]
    fn unit_area_found_by_id_name_or_alias() {
        let areas = areas();
        assert_eq!(find_area(&areas, "kitchen").map(|a| a.id.as_str()), Some("kitchen"));
        assert_eq!(
            find_area(&areas, "living room").map(|a| a.id.as_str()),
            Some("living_room")
        );
        assert_eq!(
            find_area(&areas, "LOUNGE").map(|a| a.id.as_str()),
            Some("living_room")
        );
    }

    #[test]
    fn unit_unknown_area_is_none() {
        assert!(find_area(&areas(), "garage").is_none());
    }
}
