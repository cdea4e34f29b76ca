//! Upstream payload parsers
//!
//! Contains modules for parsing JSON records, episode play-lists and
//! detail pages.

pub mod episodes;
pub mod html;
pub mod records;

pub use episodes::{DetailPayload, EpisodeExtractor, parse_play_url, scan_m3u8_links};
pub use html::{DetailPage, extract_html_episodes, parse_detail_page};
pub use records::{VodRecord, normalize_search_results, parse_vod_list, video_detail_from_record};
