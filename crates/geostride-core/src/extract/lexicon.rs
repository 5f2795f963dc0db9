//! Bilingual vocabulary used by the movement gate and the strategies.
//!
//! ASCII terms match on word boundaries so that "go" does not fire inside
//! "good"; CJK terms match as plain substrings.

use lazy_static::lazy_static;

use crate::types::{Direction, SpeedProfile};

/// Movement verbs, direction and unit tokens, coordinate labels, map hosts
pub const MOVEMENT_VOCABULARY: &[&str] = &[
    // Chinese movement terms
    "移動", "去", "前往", "到", "走", "跑", "移動到", "帶我去", "導航到",
    "向前", "向後", "向左", "向右", "往北", "往南", "往東", "往西",
    "北邊", "南邊", "東邊", "西邊", "東北", "西北", "東南", "西南",
    // English movement terms
    "move", "go", "walk", "run", "navigate", "travel", "head", "fly", "take me", "bring me",
    "north", "south", "east", "west", "northeast", "northwest", "southeast", "southwest",
    "forward", "forwards", "backward", "backwards", "back", "left", "right",
    // Distance indicators
    "公尺", "米", "公里", "meter", "meters", "metre", "metres", "km", "kilometer", "kilometers",
    "步", "step", "steps", "距離", "distance",
    // Location indicators
    "位置", "地點", "coordinates", "座標", "經緯度", "緯度", "經度",
    "latitude", "longitude", "lat", "lng",
    // Mapping-service links
    "google.com/maps", "maps.google", "goo.gl/maps", "maps.app.goo.gl",
];

/// Well-known places with a reference coordinate. The gazetteer and the
/// offline geocoder are both built from this list. Category nouns point at a
/// representative spot.
pub const PLACES: &[(&str, f64, f64)] = &[
    // 主要城市
    ("台北市", 25.0330, 121.5654),
    ("新北市", 25.0120, 121.4657),
    ("桃園市", 24.9936, 121.3010),
    ("台中市", 24.1477, 120.6736),
    ("台南市", 22.9999, 120.2270),
    ("高雄市", 22.6273, 120.3014),
    ("基隆市", 25.1276, 121.7392),
    ("新竹市", 24.8138, 120.9675),
    ("嘉義市", 23.4801, 120.4491),
    ("彰化縣", 24.0518, 120.5161),
    ("台北", 25.0330, 121.5654),
    ("新北", 25.0120, 121.4657),
    ("桃園", 24.9936, 121.3010),
    ("台中", 24.1477, 120.6736),
    ("台南", 22.9999, 120.2270),
    ("高雄", 22.6273, 120.3014),
    ("基隆", 25.1276, 121.7392),
    ("新竹", 24.8138, 120.9675),
    ("嘉義", 23.4801, 120.4491),
    ("彰化", 24.0518, 120.5161),
    ("南投", 23.9157, 120.6639),
    ("雲林", 23.7092, 120.5434),
    ("屏東", 22.6690, 120.4862),
    ("宜蘭", 24.7021, 121.7378),
    ("花蓮", 23.9872, 121.6015),
    ("台東", 22.7583, 121.1444),
    ("澎湖", 23.5655, 119.5793),
    ("金門", 24.4321, 118.3171),
    ("馬祖", 26.1597, 119.9519),
    // 著名景點
    ("台北101", 25.0339, 121.5645),
    ("中正紀念堂", 25.0345, 121.5219),
    ("故宮", 25.1024, 121.5485),
    ("總統府", 25.0401, 121.5118),
    ("自由廣場", 25.0355, 121.5199),
    ("龍山寺", 25.0372, 121.4999),
    ("西門町", 25.0422, 121.5078),
    ("九份", 25.1092, 121.8446),
    ("淡水", 25.1677, 121.4453),
    ("北投", 25.1367, 121.5065),
    ("陽明山", 25.1553, 121.5477),
    ("日月潭", 23.8573, 120.9155),
    ("阿里山", 23.5085, 120.8027),
    ("太魯閣", 24.1577, 121.6217),
    ("墾丁", 21.9518, 120.7968),
    ("清境", 24.0572, 121.1623),
    ("合歡山", 24.1446, 121.2750),
    ("玉山", 23.4700, 120.9572),
    ("溪頭", 23.6745, 120.7966),
    ("杉林溪", 23.6392, 120.7923),
    ("集集", 23.8267, 120.7850),
    ("鹿港", 24.0543, 120.4340),
    ("安平", 23.0015, 120.1606),
    ("赤崁樓", 22.9975, 120.2025),
    ("愛河", 22.6241, 120.2870),
    ("旗津", 22.6133, 120.2665),
    ("佛光山", 22.7560, 120.4437),
    ("義大世界", 22.7296, 120.4085),
    ("六合夜市", 22.6319, 120.3000),
    ("逢甲夜市", 24.1747, 120.6459),
    ("士林夜市", 25.0880, 121.5240),
    ("饒河夜市", 25.0509, 121.5776),
    ("一中商圈", 24.1498, 120.6851),
    ("東海大學", 24.1817, 120.6006),
    ("中興大學", 24.1234, 120.6750),
    ("成功大學", 22.9970, 120.2172),
    ("中山大學", 22.6273, 120.2660),
    ("高雄大學", 22.7335, 120.2868),
    ("台灣大學", 25.0174, 121.5405),
    // 類別名詞
    ("夜市", 25.0880, 121.5240),
    ("火車站", 25.0478, 121.5170),
    ("高鐵站", 25.0478, 121.5170),
    ("捷運站", 25.0478, 121.5170),
    ("機場", 25.0797, 121.2342),
    ("動物園", 24.9983, 121.5810),
    ("老街", 25.1092, 121.8446),
    // English names
    ("Taipei", 25.0330, 121.5654),
    ("New Taipei", 25.0120, 121.4657),
    ("Kaohsiung", 22.6273, 120.3014),
    ("Taichung", 24.1477, 120.6736),
    ("Tainan", 22.9999, 120.2270),
    ("Taoyuan", 24.9936, 121.3010),
    ("Hsinchu", 24.8138, 120.9675),
    ("Keelung", 25.1276, 121.7392),
    ("Chiayi", 23.4801, 120.4491),
    ("Changhua", 24.0518, 120.5161),
    ("Nantou", 23.9157, 120.6639),
    ("Yunlin", 23.7092, 120.5434),
    ("Pingtung", 22.6690, 120.4862),
    ("Yilan", 24.7021, 121.7378),
    ("Hualien", 23.9872, 121.6015),
    ("Taitung", 22.7583, 121.1444),
    ("Penghu", 23.5655, 119.5793),
    ("Kinmen", 24.4321, 118.3171),
    ("Matsu", 26.1597, 119.9519),
    ("Taipei 101", 25.0339, 121.5645),
    ("Sun Moon Lake", 23.8573, 120.9155),
    ("Alishan", 23.5085, 120.8027),
    ("Taroko", 24.1577, 121.6217),
    ("Kenting", 21.9518, 120.7968),
    ("Yangmingshan", 25.1553, 121.5477),
    ("Jiufen", 25.1092, 121.8446),
    ("Tamsui", 25.1677, 121.4453),
    ("Beitou", 25.1367, 121.5065),
    ("Ximending", 25.0422, 121.5078),
    ("Longshan Temple", 25.0372, 121.4999),
    ("National Palace Museum", 25.1024, 121.5485),
    ("Chiang Kai-shek Memorial Hall", 25.0345, 121.5219),
    ("Shilin Night Market", 25.0880, 121.5240),
    ("Raohe Night Market", 25.0509, 121.5776),
    ("Fengjia Night Market", 24.1747, 120.6459),
    ("Liuhe Night Market", 22.6319, 120.3000),
    ("Taipei Zoo", 24.9983, 121.5810),
    ("night market", 25.0880, 121.5240),
    ("train station", 25.0478, 121.5170),
    ("high speed rail station", 25.0478, 121.5170),
    ("airport", 25.0797, 121.2342),
];

/// Direction tokens, compound headings before the cardinal ones they contain
pub const DIRECTION_TOKENS: &[(&str, Direction)] = &[
    ("northeast", Direction::NorthEast),
    ("north-east", Direction::NorthEast),
    ("northwest", Direction::NorthWest),
    ("north-west", Direction::NorthWest),
    ("southeast", Direction::SouthEast),
    ("south-east", Direction::SouthEast),
    ("southwest", Direction::SouthWest),
    ("south-west", Direction::SouthWest),
    ("東北", Direction::NorthEast),
    ("西北", Direction::NorthWest),
    ("東南", Direction::SouthEast),
    ("西南", Direction::SouthWest),
    ("north", Direction::North),
    ("south", Direction::South),
    ("east", Direction::East),
    ("west", Direction::West),
    ("北", Direction::North),
    ("南", Direction::South),
    ("東", Direction::East),
    ("西", Direction::West),
    ("forwards", Direction::Forward),
    ("forward", Direction::Forward),
    ("ahead", Direction::Forward),
    ("backwards", Direction::Backward),
    ("backward", Direction::Backward),
    ("back", Direction::Backward),
    ("left", Direction::Left),
    ("right", Direction::Right),
    ("前", Direction::Forward),
    ("後", Direction::Backward),
    ("左", Direction::Left),
    ("右", Direction::Right),
];

/// Characters that turn a CJK direction into a heading phrase (北邊, 南方, 前面)
const DIRECTION_SUFFIXES: &[&str] = &["邊", "方", "面"];

/// Words that end a place-name phrase ("go to Taichung to eat noodles")
pub const PHRASE_STOP_WORDS: &[&str] = &[
    "to", "and", "then", "for", "eat", "drink", "buy", "play", "shop", "see", "with", "please",
    "now", "quickly", "slowly", "fast",
];

/// Leading articles stripped from a place-name phrase
pub const ARTICLES: &[&str] = &["the", "a", "an"];

const SLOW_WORDS: &[&str] = &["slowly", "slow", "leisurely", "慢慢", "慢"];
const FAST_WORDS: &[&str] = &["quickly", "fast", "run", "running", "hurry", "sprint", "跑", "快"];

lazy_static! {
    /// Place names as (lowercased, display) pairs, longest first so a specific
    /// landmark wins over the city name it starts with
    pub static ref GAZETTEER: Vec<(String, &'static str)> = {
        let mut entries: Vec<(String, &'static str)> = PLACES
            .iter()
            .map(|(name, _, _)| (name.to_lowercase(), *name))
            .collect();
        entries.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        entries
    };
}

/// Case-insensitive term lookup. `haystack` must already be lowercased.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if !term.is_ascii() {
        return haystack.contains(term);
    }

    let term = term.to_ascii_lowercase();
    haystack.match_indices(term.as_str()).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.map_or(false, |c| c.is_alphabetic()) && !after.map_or(false, |c| c.is_alphabetic())
    })
}

/// Whether any movement vocabulary term occurs in the text
pub fn has_movement_vocabulary(lower: &str) -> bool {
    MOVEMENT_VOCABULARY
        .iter()
        .any(|term| contains_term(lower, term))
}

/// First gazetteer entry found in the text, most specific first
pub fn find_gazetteer_entry(lower: &str) -> Option<&'static str> {
    GAZETTEER
        .iter()
        .find(|(needle, _)| contains_term(lower, needle))
        .map(|(_, display)| *display)
}

/// First direction token found in the text, in priority order
pub fn find_direction(lower: &str) -> Option<Direction> {
    DIRECTION_TOKENS
        .iter()
        .find(|(token, _)| contains_term(lower, token))
        .map(|(_, direction)| *direction)
}

/// Whether a captured phrase opens with a heading ("left 50 meters", "北邊").
///
/// A lone CJK direction character only counts when nothing but a direction
/// suffix, a number or the end of the phrase follows it, so "南港" and
/// "北投" stay place names.
pub fn starts_with_direction(phrase: &str) -> bool {
    let lower = phrase.trim().to_lowercase();
    DIRECTION_TOKENS.iter().any(|(token, _)| {
        let Some(rest) = lower.strip_prefix(token) else {
            return false;
        };
        if token.is_ascii() {
            return !rest.chars().next().map_or(false, |c| c.is_alphabetic());
        }
        rest.is_empty()
            || DIRECTION_SUFFIXES.iter().any(|suffix| rest.starts_with(suffix))
            || rest.starts_with(|c: char| c.is_ascii_digit() || c.is_whitespace())
    })
}

/// Tempo requested by the text, normal when nothing says otherwise
pub fn detect_speed(lower: &str) -> SpeedProfile {
    if SLOW_WORDS.iter().any(|w| contains_term(lower, w)) {
        SpeedProfile::Slow
    } else if FAST_WORDS.iter().any(|w| contains_term(lower, w)) {
        SpeedProfile::Fast
    } else {
        SpeedProfile::Normal
    }
}
