//! # Regions
//!
//! The fixed set of region codes a report can be filed under.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! regions {
    ($($variant:ident => $code:literal, $label:literal;)+) => {
        /// Administrative region where the pet went missing.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Region {
            $($variant,)+
        }

        impl Region {
            pub const ALL: &'static [Region] = &[$(Region::$variant,)+];

            /// The stable code stored in records and used in filters.
            pub fn code(self) -> &'static str {
                match self {
                    $(Region::$variant => $code,)+
                }
            }

            /// Display label.
            pub fn label(self) -> &'static str {
                match self {
                    $(Region::$variant => $label,)+
                }
            }
        }

        impl FromStr for Region {
            type Err = UnknownRegion;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($code => Ok(Region::$variant),)+
                    _ => Err(UnknownRegion(s.to_string())),
                }
            }
        }
    };
}

regions! {
    Taipei => "taipei", "Taipei City";
    NewTaipei => "new_taipei", "New Taipei City";
    Keelung => "keelung", "Keelung City";
    Taoyuan => "taoyuan", "Taoyuan City";
    HsinchuCity => "hsinchu_city", "Hsinchu City";
    HsinchuCounty => "hsinchu_county", "Hsinchu County";
    Miaoli => "miaoli", "Miaoli County";
    Taichung => "taichung", "Taichung City";
    Changhua => "changhua", "Changhua County";
    Nantou => "nantou", "Nantou County";
    Yunlin => "yunlin", "Yunlin County";
    ChiayiCity => "chiayi_city", "Chiayi City";
    ChiayiCounty => "chiayi_county", "Chiayi County";
    Tainan => "tainan", "Tainan City";
    Kaohsiung => "kaohsiung", "Kaohsiung City";
    Pingtung => "pingtung", "Pingtung County";
    Yilan => "yilan", "Yilan County";
    Hualien => "hualien", "Hualien County";
    Taitung => "taitung", "Taitung County";
    Penghu => "penghu", "Penghu County";
    Kinmen => "kinmen", "Kinmen County";
    Lienchiang => "lienchiang", "Lienchiang County";
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown region code {0:?}")]
pub struct UnknownRegion(pub String);

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}
