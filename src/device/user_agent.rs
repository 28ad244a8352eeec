use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Unknown,
}

impl Default for DeviceType {
    fn default() -> Self {
        DeviceType::Unknown
    }
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Desktop => "desktop",
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Unknown => "unknown",
        }
    }
}

/// Coarse client description extracted from a `User-Agent` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTraits {
    pub browser_family: String,
    pub browser_version: Option<String>,
    pub platform: String,
    pub platform_version: Option<String>,
    pub device_type: DeviceType,
}

impl DeviceTraits {
    pub fn unknown() -> Self {
        Self {
            browser_family: UNKNOWN.to_string(),
            browser_version: None,
            platform: UNKNOWN.to_string(),
            platform_version: None,
            device_type: DeviceType::Unknown,
        }
    }

    pub fn browser_major(&self) -> Option<&str> {
        self.browser_version
            .as_deref()
            .and_then(|v| v.split('.').next())
            .filter(|major| !major.is_empty())
    }

    pub fn is_browser_known(&self) -> bool {
        self.browser_family != UNKNOWN
    }

    pub fn is_platform_known(&self) -> bool {
        self.platform != UNKNOWN
    }

    /// Human label such as "Chrome on Windows".
    pub fn display_name(&self) -> String {
        match (self.is_browser_known(), self.is_platform_known()) {
            (true, true) => format!("{} on {}", self.browser_family, self.platform),
            (true, false) => self.browser_family.clone(),
            (false, true) => format!("{} device", self.platform),
            (false, false) => "Unknown device".to_string(),
        }
    }
}

// Order matters: Edge/Opera/Samsung UAs also contain "Chrome" and "Safari".
static BROWSERS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("Edge", r"Edg(?:e|A|iOS)?/([\d.]+)"),
        ("Opera", r"(?:OPR|OPiOS)/([\d.]+)"),
        ("Samsung Internet", r"SamsungBrowser/([\d.]+)"),
        ("Firefox", r"(?:Firefox|FxiOS)/([\d.]+)"),
        ("Chrome", r"(?:Chrome|CriOS)/([\d.]+)"),
        ("Safari", r"Version/([\d.]+).*Safari/"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).unwrap()))
    .collect()
});

static IOS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:iPhone|CPU) OS (\d+(?:_\d+)*)").unwrap());
static ANDROID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Android (\d+(?:\.\d+)*)").unwrap());
static WINDOWS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Windows NT (\d+\.\d+)").unwrap());
static MACOS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Mac OS X (\d+(?:[_.]\d+)*)").unwrap());

fn capture(re: &Regex, ua: &str) -> Option<String> {
    re.captures(ua)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace('_', "."))
}

fn parse_browser(ua: &str) -> (String, Option<String>) {
    for (name, re) in BROWSERS.iter() {
        if let Some(caps) = re.captures(ua) {
            let version = caps.get(1).map(|m| m.as_str().to_string());
            return (name.to_string(), version);
        }
    }
    (UNKNOWN.to_string(), None)
}

fn parse_platform(ua: &str) -> (String, Option<String>) {
    if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
        return ("iOS".to_string(), capture(&IOS_RE, ua));
    }
    if ua.contains("Android") {
        return ("Android".to_string(), capture(&ANDROID_RE, ua));
    }
    if ua.contains("Windows") {
        return ("Windows".to_string(), capture(&WINDOWS_RE, ua));
    }
    if ua.contains("CrOS") {
        return ("ChromeOS".to_string(), None);
    }
    if ua.contains("Macintosh") || ua.contains("Mac OS X") {
        return ("macOS".to_string(), capture(&MACOS_RE, ua));
    }
    if ua.contains("Linux") || ua.contains("X11") {
        return ("Linux".to_string(), None);
    }
    (UNKNOWN.to_string(), None)
}

fn parse_device_type(ua: &str, platform: &str) -> DeviceType {
    if ua.contains("iPad") || ua.contains("Tablet") {
        return DeviceType::Tablet;
    }
    if ua.contains("Mobi") || ua.contains("iPhone") || ua.contains("iPod") {
        return DeviceType::Mobile;
    }
    match platform {
        // Android without "Mobile" is a tablet build.
        "Android" => DeviceType::Tablet,
        "Windows" | "macOS" | "Linux" | "ChromeOS" => DeviceType::Desktop,
        _ => DeviceType::Unknown,
    }
}

pub fn parse_user_agent(ua: Option<&str>) -> DeviceTraits {
    let Some(ua) = ua.map(str::trim).filter(|ua| !ua.is_empty()) else {
        return DeviceTraits::unknown();
    };

    let (browser_family, browser_version) = parse_browser(ua);
    let (platform, platform_version) = parse_platform(ua);
    let device_type = parse_device_type(ua, &platform);

    DeviceTraits {
        browser_family,
        browser_version,
        platform,
        platform_version,
        device_type,
    }
}
