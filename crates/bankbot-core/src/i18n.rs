//! Message table for the text the client shows on its own behalf.
//!
//! Only the strings the gateway and its prompts need live here. Locales
//! starting with `zh` use the Chinese table; everything else falls back to
//! `en-US`.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    ExpiredTitle,
    ExpiredBody,
    ReloginLabel,
    CancelLabel,
    ControlPanel,
    SelectSchema,
    ServiceError,
}

/// Look up the text for `key` in `locale`.
pub fn text(locale: &str, key: MessageKey) -> &'static str {
    if locale.to_ascii_lowercase().starts_with("zh") {
        zh(key)
    } else {
        en_us(key)
    }
}

fn zh(key: MessageKey) -> &'static str {
    match key {
        MessageKey::ExpiredTitle => "确认注销",
        MessageKey::ExpiredBody => "您的登陆凭据已过期，请重新登陆，或者点击取消留在本页面",
        MessageKey::ReloginLabel => "重新登陆",
        MessageKey::CancelLabel => "取消",
        MessageKey::ControlPanel => "控制台",
        MessageKey::SelectSchema => "选择一个方案",
        MessageKey::ServiceError => "连接服务器失败，请刷新重试",
    }
}

fn en_us(key: MessageKey) -> &'static str {
    match key {
        MessageKey::ExpiredTitle => "Confirm logout",
        MessageKey::ExpiredBody => {
            "Your sign-in has expired. Sign in again, or cancel to stay on this page."
        }
        MessageKey::ReloginLabel => "Sign in again",
        MessageKey::CancelLabel => "Cancel",
        MessageKey::ControlPanel => "Control Panel",
        MessageKey::SelectSchema => "Select a schema",
        MessageKey::ServiceError => "Fail to connect the server. Please refresh.",
    }
}
