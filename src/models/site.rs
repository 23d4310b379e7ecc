//! Site branding and website imagery

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default site name used when no branding row exists
pub const DEFAULT_SITE_NAME: &str = "School Of IT Skills";

/// Site name and logo. The most recently updated row is active.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteBranding {
    pub id: i64,
    pub site_name: String,
    /// Logo file relative to the media root
    pub logo_path: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// An image shown on one page of the public site (or on every page).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebsiteImage {
    pub id: i64,
    pub title: String,
    /// Image file relative to the media root
    pub image_path: String,
    pub page: PageSlot,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Public page an image belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSlot {
    Home,
    About,
    Course,
    Testimonials,
    Contact,
    #[default]
    Global,
}

impl PageSlot {
    pub const ALL: [PageSlot; 6] = [
        PageSlot::Home,
        PageSlot::About,
        PageSlot::Course,
        PageSlot::Testimonials,
        PageSlot::Contact,
        PageSlot::Global,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageSlot::Home => "home",
            PageSlot::About => "about",
            PageSlot::Course => "course",
            PageSlot::Testimonials => "testimonials",
            PageSlot::Contact => "contact",
            PageSlot::Global => "global",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PageSlot::Home => "Home",
            PageSlot::About => "About",
            PageSlot::Course => "Course",
            PageSlot::Testimonials => "Testimonials",
            PageSlot::Contact => "Contact",
            PageSlot::Global => "Global",
        }
    }
}

impl fmt::Display for PageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageSlot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Invalid page slot: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_slot_from_str() {
        for slot in PageSlot::ALL {
            assert_eq!(slot.as_str().parse::<PageSlot>().unwrap(), slot);
        }
        assert!("footer".parse::<PageSlot>().is_err());
        assert_eq!(PageSlot::default(), PageSlot::Global);
    }
}
