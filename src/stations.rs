//! Station registry for the Ise Bay marine weather service.
//!
//! Every station publishes its latest readings as an HTML table on a Japan
//! Coast Guard page. Stations differ in whether they report wave height and
//! in how often the page is refreshed.
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Station whose timestamps define the aligned timeline
pub const DEFAULT_REFERENCE_STATION: &str = "iragomisaki_vtss";

/// One monitored site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StationConfig {
    pub name: String,
    /// Unique station code, also the storage key
    pub code: String,
    pub url: String,
    pub has_wave_height: bool,
    /// Page refresh cadence, doubles as the alignment tolerance
    #[serde(rename = "update_interval")]
    pub update_interval_minutes: i64,
}

impl StationConfig {
    pub fn new(
        name: &str,
        code: &str,
        url: &str,
        has_wave_height: bool,
        update_interval_minutes: i64,
    ) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            url: url.to_string(),
            has_wave_height,
            update_interval_minutes,
        }
    }
}

/// The five production stations, in display and alignment order
pub fn default_stations() -> Vec<StationConfig> {
    vec![
        StationConfig::new(
            "伊良湖岬",
            "iragomisaki_vtss",
            "https://www6.kaiho.mlit.go.jp/isewan/kisyou/iragomisaki_vtss.html",
            false,
            15,
        ),
        StationConfig::new(
            "伊勢湾2号ブイ",
            "iragosuido_southeast_aisss",
            "https://www6.kaiho.mlit.go.jp/isewan/kisyou/iragosuido_southeast_aisss.html",
            true,
            30,
        ),
        // Wave height sits after the pressure column on this page
        StationConfig::new(
            "大王埼灯台",
            "daiosaki_lt",
            "https://www6.kaiho.mlit.go.jp/isewan/kisyou/daiosaki_lt.html",
            true,
            15,
        ),
        StationConfig::new(
            "名古屋港高潮防波堤",
            "nagoyako_bw",
            "https://www6.kaiho.mlit.go.jp/nagoyako/kisyou/nagoyako_bw.html",
            false,
            15,
        ),
        StationConfig::new(
            "四日市港防波堤信号所",
            "yokkaichiko_bkw_lt",
            "https://www6.kaiho.mlit.go.jp/04kanku/yokkaichi/yokkaichiko_bkw_lt/kisyou/index.html",
            false,
            30,
        ),
    ]
}

pub fn find_station<'a>(stations: &'a [StationConfig], code: &str) -> Option<&'a StationConfig> {
    stations.iter().find(|s| s.code == code)
}
