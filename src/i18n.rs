// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持西班牙语（默认）和英文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 支持的语言
pub const SUPPORTED_LOCALES: &[&str] = &["es", "en"];

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言（不支持的语言回落到 es）
///
/// # 参数
/// - locale: 语言代码（"es" 或 "en"）
pub fn set_locale(locale: &str) {
    let normalized = locale.trim().to_lowercase();
    let short = normalized.split(['-', '_']).next().unwrap_or_default();
    if SUPPORTED_LOCALES.contains(&short) {
        rust_i18n::set_locale(short);
    } else {
        tracing::warn!(locale = locale, "不支持的语言，使用 es");
        rust_i18n::set_locale("es");
    }
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use level_import::i18n::t;
/// let msg = t("report.title");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use level_import::i18n::t_with_args;
/// let msg = t_with_args("report.source", &[("file", "niveles.csv")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::warning::ImportWarning;
    use std::sync::Mutex;

    // rust-i18n 的 locale 为全局状态，且 Rust 测试默认并行执行；
    // 为避免测试互相干扰，这里对 i18n 相关测试串行化。
    pub(crate) static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        assert_eq!(current_locale(), "en");

        set_locale("es-ES");
        assert_eq!(current_locale(), "es");

        set_locale("zh-CN");
        assert_eq!(current_locale(), "es");
    }

    #[test]
    fn test_translate_simple() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("es");
        assert_eq!(t("report.warnings_header"), "Observaciones:");

        set_locale("en");
        assert_eq!(t("report.warnings_header"), "Notes:");

        set_locale("es");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("es");
        let msg = t_with_args("report.source", &[("file", "/tmp/niveles.csv")]);
        assert_eq!(msg, "Archivo: /tmp/niveles.csv");

        set_locale("en");
        let msg = t_with_args("report.source", &[("file", "/tmp/niveles.csv")]);
        assert_eq!(msg, "File: /tmp/niveles.csv");

        set_locale("es");
    }

    #[test]
    fn test_warning_display_is_localized() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        let warning = ImportWarning::InvalidElevation {
            line: 4,
            text: "abc".to_string(),
        };

        set_locale("es");
        assert_eq!(warning.to_string(), "Fila 4: cota no válida 'abc', se omite");

        set_locale("en");
        assert_eq!(warning.to_string(), "Row 4: invalid elevation 'abc', skipped");

        set_locale("es");
    }
}
