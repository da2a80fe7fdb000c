//! Object-path and action matching for policy rules.
//!
//! Patterns are matched segment by segment on `/`:
//!
//! | Pattern segment | Matches |
//! |---|---|
//! | `*`, `:name`, `{name}` | exactly one non-empty segment |
//! | `**` (last segment only) | one or more remaining segments |
//! | anything else | that literal segment |
//!
//! A pattern consisting solely of `*` matches every path.

/// Action wildcard meaning "any action".
pub const ANY_ACTION: &str = "*";

/// Whether `path` is covered by `pattern`.
pub fn path_matches(pattern: &str, path: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let pattern: Vec<&str> = pattern.split('/').collect();
    let path: Vec<&str> = path.split('/').collect();

    for (i, segment) in pattern.iter().enumerate() {
        let last = i + 1 == pattern.len();
        if *segment == "**" && last {
            return path.len() > i && path[i..].iter().all(|s| !s.is_empty());
        }
        let Some(actual) = path.get(i) else {
            return false;
        };
        if is_single_wildcard(segment) {
            if actual.is_empty() {
                return false;
            }
        } else if segment != actual {
            return false;
        }
    }
    pattern.len() == path.len()
}

fn is_single_wildcard(segment: &str) -> bool {
    segment == "*"
        || (segment.len() > 1 && segment.starts_with(':'))
        || (segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}'))
}

/// Exact (ASCII case-insensitive) or universal action match.
pub fn action_matches(pattern: &str, action: &str) -> bool {
    pattern == ANY_ACTION || pattern.eq_ignore_ascii_case(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_segment_wildcard() {
        assert!(path_matches("/api/v1/users/*", "/api/v1/users/7"));
        assert!(!path_matches("/api/v1/users/*", "/api/v1/users/7/roles"));
        assert!(!path_matches("/api/v1/users/*", "/api/v1/users"));
        assert!(!path_matches("/api/v1/users/*", "/api/v1/users/"));
    }

    #[test]
    fn multi_segment_wildcard() {
        assert!(path_matches("/api/v1/users/**", "/api/v1/users/7"));
        assert!(path_matches("/api/v1/users/**", "/api/v1/users/7/roles"));
        assert!(!path_matches("/api/v1/users/**", "/api/v1/users"));
        assert!(!path_matches("/api/v1/users/**", "/api/v1/groups/7"));
    }

    #[test]
    fn wildcard_in_the_middle() {
        assert!(path_matches("/api/v1/users/*/roles", "/api/v1/users/7/roles"));
        assert!(!path_matches("/api/v1/users/*/roles", "/api/v1/users/7/posts"));
    }

    #[test]
    fn named_parameters_match_one_segment() {
        assert!(path_matches("/api/v1/dept/:id", "/api/v1/dept/3"));
        assert!(path_matches("/api/v1/dept/{id}", "/api/v1/dept/3"));
        assert!(!path_matches("/api/v1/dept/:id", "/api/v1/dept/3/children"));
    }

    #[test]
    fn literal_paths_match_exactly() {
        assert!(path_matches("/api/v1/menu", "/api/v1/menu"));
        assert!(!path_matches("/api/v1/menu", "/api/v1/menus"));
        assert!(!path_matches("/api/v1/menu", "/api/v1/menu/1"));
    }

    #[test]
    fn bare_star_matches_everything() {
        assert!(path_matches("*", "/anything/at/all"));
    }

    #[test]
    fn action_matching() {
        assert!(action_matches("GET", "GET"));
        assert!(action_matches("get", "GET"));
        assert!(action_matches("*", "DELETE"));
        assert!(!action_matches("read", "write"));
    }
}
