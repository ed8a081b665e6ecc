//! User-agent parsing and classification
//!
//! A raw `User-Agent` header is parsed into an OS, a browser name/version and
//! device flags, then classified into the `http.user_agent.*` attributes.
//!
//! Browser resolution is order sensitive. Compatibility tokens mean a single
//! string can carry `Chrome/`, `Safari/` and `Edge/` at once, so both the parser
//! and the classifier evaluate their candidates in a fixed priority order and
//! stop at the first match.

use regex::Regex;
use std::sync::OnceLock;

use super::attributes::RequestAttributes;

pub const USER_AGENT_OS: &str = "http.user_agent.os";
pub const USER_AGENT_OS_VERSION: &str = "http.user_agent.os_version";
pub const USER_AGENT_DEVICE: &str = "http.user_agent.device";
pub const USER_AGENT_BROWSER: &str = "http.user_agent.browser";
pub const USER_AGENT_BROWSER_VERSION: &str = "http.user_agent.browser_version";

const TRIDENT: &str = "Trident";

/// Device class attached to a classified user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Mobile,
    Desktop,
    Bot,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Mobile => "mobile",
            Device::Desktop => "desktop",
            Device::Bot => "bot",
        }
    }
}

/// Browser identity attached to mobile and desktop clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Chrome,
    Safari,
    Firefox,
    Opera,
    InternetExplorer,
    Edge,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Safari => "safari",
            Browser::Firefox => "firefox",
            Browser::Opera => "opera",
            Browser::InternetExplorer => "ie",
            Browser::Edge => "edge",
        }
    }
}

/// Client names produced by [`UserAgent::parse`].
pub mod names {
    pub const CHROME: &str = "Chrome";
    pub const SAFARI: &str = "Safari";
    pub const FIREFOX: &str = "Firefox";
    pub const OPERA: &str = "Opera";
    pub const INTERNET_EXPLORER: &str = "Internet Explorer";
    pub const EDGE: &str = "Edge";

    pub const WINDOWS: &str = "Windows";
    pub const WINDOWS_PHONE: &str = "Windows Phone";
    pub const MACOS: &str = "macOS";
    pub const IOS: &str = "iOS";
    pub const ANDROID: &str = "Android";
    pub const CHROME_OS: &str = "ChromeOS";
    pub const LINUX: &str = "Linux";
    pub const FREEBSD: &str = "FreeBSD";
}

struct UserAgentPatterns {
    bot: Regex,
    bot_name: Regex,
    windows_phone: Regex,
    windows: Regex,
    ios: Regex,
    android: Regex,
    mac: Regex,
    browsers: Vec<(&'static str, Regex)>,
}

static PATTERNS: OnceLock<UserAgentPatterns> = OnceLock::new();

fn patterns() -> &'static UserAgentPatterns {
    PATTERNS.get_or_init(|| UserAgentPatterns {
        bot: Regex::new(r"(?i)(bot\b|bot/|crawl|spider|slurp|facebookexternalhit)").unwrap(),
        bot_name: Regex::new(r"(?i)\b([a-z]*(?:bot|spider|slurp))(?:/(\d+(?:\.\d+)*))?").unwrap(),
        windows_phone: Regex::new(r"Windows Phone(?: OS)? (\d+(?:\.\d+)*)").unwrap(),
        windows: Regex::new(r"Windows NT (\d+\.\d+)").unwrap(),
        ios: Regex::new(r"(?:iPhone|CPU) OS (\d+(?:_\d+)*)").unwrap(),
        android: Regex::new(r"Android (\d+(?:\.\d+)*)").unwrap(),
        mac: Regex::new(r"Mac OS X (\d+(?:[_.]\d+)*)").unwrap(),
        // Priority order matters: Edge and Opera ship Chrome tokens, Chrome ships a Safari token.
        browsers: vec![
            (names::EDGE, Regex::new(r"\b(?:Edge|Edg|EdgA|EdgiOS)/(\d+(?:\.\d+)*)").unwrap()),
            (names::OPERA, Regex::new(r"\b(?:OPR|Opera)/(\d+(?:\.\d+)*)").unwrap()),
            (names::FIREFOX, Regex::new(r"\b(?:Firefox|FxiOS)/(\d+(?:\.\d+)*)").unwrap()),
            (names::CHROME, Regex::new(r"\b(?:Chrome|CriOS)/(\d+(?:\.\d+)*)").unwrap()),
            (names::INTERNET_EXPLORER, Regex::new(r"MSIE (\d+(?:\.\d+)*)").unwrap()),
            (names::INTERNET_EXPLORER, Regex::new(r"Trident/.*rv:(\d+(?:\.\d+)*)").unwrap()),
            (names::SAFARI, Regex::new(r"Version/(\d+(?:\.\d+)*).*Safari/").unwrap()),
        ],
    })
}

/// Parsed view of a raw user-agent string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgent {
    pub name: String,
    pub version: String,
    pub os: String,
    pub os_version: String,
    pub mobile: bool,
    pub tablet: bool,
    pub desktop: bool,
    pub bot: bool,
}

impl UserAgent {
    pub fn parse(raw: &str) -> Self {
        let patterns = patterns();
        let mut ua = UserAgent::default();

        let (os, os_version) = parse_os(raw, patterns);
        ua.os = os.to_string();
        ua.os_version = os_version;

        if patterns.bot.is_match(raw) {
            ua.bot = true;
            if let Some(caps) = patterns.bot_name.captures(raw) {
                ua.name = caps[1].to_string();
                ua.version = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
            }
            return ua;
        }

        for (name, pattern) in &patterns.browsers {
            if let Some(caps) = pattern.captures(raw) {
                ua.name = name.to_string();
                ua.version = caps[1].to_string();
                break;
            }
        }

        ua.tablet = raw.contains("iPad")
            || raw.contains("Tablet")
            || (ua.os == names::ANDROID && !raw.contains("Mobile"));
        ua.mobile = !ua.tablet
            && (raw.contains("Mobile")
                || raw.contains("iPhone")
                || raw.contains("iPod")
                || raw.contains("Opera Mini")
                || ua.os == names::WINDOWS_PHONE);
        ua.desktop = !ua.mobile
            && !ua.tablet
            && matches!(
                ua.os.as_str(),
                names::WINDOWS | names::MACOS | names::LINUX | names::CHROME_OS | names::FREEBSD
            );

        ua
    }

    pub fn is_chrome(&self) -> bool {
        self.name == names::CHROME
    }

    pub fn is_safari(&self) -> bool {
        self.name == names::SAFARI
    }

    pub fn is_firefox(&self) -> bool {
        self.name == names::FIREFOX
    }

    pub fn is_opera(&self) -> bool {
        self.name == names::OPERA
    }

    pub fn is_internet_explorer(&self) -> bool {
        self.name == names::INTERNET_EXPLORER
    }

    pub fn is_edge(&self) -> bool {
        self.name == names::EDGE
    }
}

fn parse_os(raw: &str, patterns: &UserAgentPatterns) -> (&'static str, String) {
    if let Some(caps) = patterns.windows_phone.captures(raw) {
        return (names::WINDOWS_PHONE, caps[1].to_string());
    }
    if let Some(caps) = patterns.windows.captures(raw) {
        return (names::WINDOWS, windows_release(&caps[1]).to_string());
    }
    if let Some(caps) = patterns.ios.captures(raw) {
        return (names::IOS, caps[1].replace('_', "."));
    }
    if let Some(caps) = patterns.android.captures(raw) {
        return (names::ANDROID, caps[1].to_string());
    }
    if let Some(caps) = patterns.mac.captures(raw) {
        return (names::MACOS, caps[1].replace('_', "."));
    }
    if raw.contains("CrOS") {
        return (names::CHROME_OS, String::new());
    }
    if raw.contains("Linux") {
        return (names::LINUX, String::new());
    }
    if raw.contains("FreeBSD") {
        return (names::FREEBSD, String::new());
    }
    ("", String::new())
}

fn windows_release(nt_version: &str) -> &str {
    match nt_version {
        "10.0" => "10",
        "6.3" => "8.1",
        "6.2" => "8",
        "6.1" => "7",
        "6.0" => "Vista",
        "5.1" | "5.2" => "XP",
        other => other,
    }
}

/// Classified user agent, ready to be flattened into attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentProfile {
    pub os: String,
    pub os_version: String,
    pub device: Option<Device>,
    /// Set only for mobile and desktop clients; `None` inside means no predicate matched.
    pub browser: Option<Option<Browser>>,
    pub browser_version: Option<String>,
}

/// Classify a raw user-agent. Returns `None` for an empty string.
pub fn classify_user_agent(raw: &str) -> Option<UserAgentProfile> {
    if raw.is_empty() {
        return None;
    }

    let ua = UserAgent::parse(raw);

    let device = if ua.mobile || ua.tablet {
        Some(Device::Mobile)
    } else if ua.desktop {
        Some(Device::Desktop)
    } else if ua.bot {
        Some(Device::Bot)
    } else {
        None
    };

    let mut profile = UserAgentProfile {
        os: ua.os.clone(),
        os_version: ua.os_version.clone(),
        device,
        browser: None,
        browser_version: None,
    };

    if ua.mobile || ua.tablet || ua.desktop {
        let browser = if ua.is_chrome() {
            Some(Browser::Chrome)
        } else if ua.is_safari() {
            Some(Browser::Safari)
        } else if ua.is_firefox() {
            Some(Browser::Firefox)
        } else if ua.is_opera() {
            Some(Browser::Opera)
        } else if ua.is_internet_explorer() || raw.contains(TRIDENT) {
            Some(Browser::InternetExplorer)
        } else if ua.is_edge() {
            Some(Browser::Edge)
        } else {
            None
        };

        profile.browser = Some(browser);
        profile.browser_version = Some(ua.version);
    }

    Some(profile)
}

/// Parse a raw user-agent into `http.user_agent.*` attributes.
///
/// An empty user-agent yields no attributes at all.
pub fn parse_user_agent(raw: &str) -> RequestAttributes {
    let mut attributes = RequestAttributes::new();
    let Some(profile) = classify_user_agent(raw) else {
        return attributes;
    };

    attributes.insert(USER_AGENT_OS, profile.os);
    attributes.insert(USER_AGENT_OS_VERSION, profile.os_version);
    attributes.insert(
        USER_AGENT_DEVICE,
        profile.device.map(|d| d.as_str()).unwrap_or_default(),
    );

    if let Some(browser) = profile.browser {
        attributes.insert(
            USER_AGENT_BROWSER,
            browser.map(|b| b.as_str()).unwrap_or_default(),
        );
        attributes.insert(
            USER_AGENT_BROWSER_VERSION,
            profile.browser_version.unwrap_or_default(),
        );
    }

    attributes
}
