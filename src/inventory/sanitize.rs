//! Group name sanitization.
//!
//! Chef attribute values (role names, recipe names such as `apache2::mod_ssl`,
//! free-form tags) end up inside inventory group names, which only tolerate
//! ASCII letters, digits, `-` and `_`.

/// Sanitize a string to be a valid inventory group name.
///
/// Runs of two or more `:` collapse into one, then every character that is
/// not an ASCII letter, ASCII digit or `-` becomes `_`. Distinct inputs may
/// map to the same name; their group memberships then merge.
///
/// ```
/// use chef_inventory::inventory::sanitize_group_name;
///
/// assert_eq!(sanitize_group_name("apache2::mod_ssl"), "apache2_mod_ssl");
/// assert_eq!(sanitize_group_name("ok-Name1"), "ok-Name1");
/// ```
pub fn sanitize_group_name(word: &str) -> String {
    let mut result = String::with_capacity(word.len());
    let mut in_colon_run = false;

    for ch in word.chars() {
        if ch == ':' {
            if !in_colon_run {
                result.push('_');
            }
            in_colon_run = true;
            continue;
        }

        in_colon_run = false;
        if ch.is_ascii_alphanumeric() || ch == '-' {
            result.push(ch);
        } else {
            result.push('_');
        }
    }

    result
}
