/// Template used when the user never customised one.
pub const DEFAULT_CONTENT_TEMPLATE: &str = "# {title}\n- [Source]({url})";

/// Title and URL used when previewing a template.
pub const PREVIEW_TITLE: &str = "Example Page Title";
pub const PREVIEW_URL: &str = "https://example.com";

/// Encodes only the parentheses of a URL so it survives inside a markdown
/// link target. Everything else is left untouched.
pub fn encode_url(url: &str) -> String {
    url.replace('(', "%28").replace(')', "%29")
}

/// Fills `{title}` and `{url}` in a content template, then turns every
/// literal `\n` into a newline.
///
/// The unescape runs last, so a title or URL carrying a literal `\n` is
/// unescaped as well.
pub fn fill_content_template(template: &str, title: &str, url: &str) -> String {
    template
        .replace("{title}", title)
        .replace("{url}", &encode_url(url))
        .replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_default_template() {
        let out = fill_content_template(
            DEFAULT_CONTENT_TEMPLATE,
            "My Title",
            "https://a.com/(x)",
        );
        assert_eq!(out, "# My Title\n- [Source](https://a.com/%28x%29)");
    }

    #[test]
    fn empty_values_and_templates() {
        assert_eq!(fill_content_template("{title}", "", ""), "");
        assert_eq!(fill_content_template("", "T", "U"), "");
    }

    #[test]
    fn no_placeholders_is_unchanged() {
        assert_eq!(
            fill_content_template("no placeholders", "T", "U"),
            "no placeholders"
        );
    }

    #[test]
    fn unknown_tokens_pass_through() {
        assert_eq!(
            fill_content_template("{date} {title} {Title}", "a", "b"),
            "{date} a {Title}"
        );
    }

    #[test]
    fn every_occurrence_is_replaced() {
        assert_eq!(
            fill_content_template("{url} {url} {title}{title}", "t", "u(1)"),
            "u%281%29 u%281%29 tt"
        );
    }

    #[test]
    fn only_parentheses_are_encoded() {
        assert_eq!(
            encode_url("https://x.org/a b?q=[1]&r=(2)#f"),
            "https://x.org/a b?q=[1]&r=%282%29#f"
        );
    }

    #[test]
    fn literal_backslash_n_becomes_newline() {
        let out = fill_content_template("# {title}\\n\\n{url}", "T", "U");
        assert_eq!(out, "# T\n\nU");
    }

    #[test]
    fn substituted_values_are_unescaped_too() {
        let out = fill_content_template("{title}", "a\\nb", "");
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn second_pass_does_not_substitute_again() {
        let once = fill_content_template(DEFAULT_CONTENT_TEMPLATE, "{x}", "https://a.com");
        let twice = fill_content_template(&once, "other", "https://b.com");
        assert_eq!(once, twice);
    }
}
