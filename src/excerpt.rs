//! Splits a post body at its "read more" marker.

/// The two halves of a post body around the excerpt marker.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Excerpt<'a> {
    /// Everything before the marker, or the whole body if there's no marker.
    pub summary: &'a str,

    /// Everything after the marker. Empty if there's no marker.
    pub remainder: &'a str,

    /// Whether the marker was found.
    pub split: bool,
}

/// Splits `body` at the first occurrence of `marker`. An empty marker never
/// matches.
pub fn split<'a>(body: &'a str, marker: &str) -> Excerpt<'a> {
    match body.find(marker).filter(|_| !marker.is_empty()) {
        Some(i) => Excerpt {
            summary: &body[..i],
            remainder: &body[i + marker.len()..],
            split: true,
        },
        None => Excerpt {
            summary: body,
            remainder: "",
            split: false,
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_without_marker() {
        let body = "Just one paragraph.\n";
        assert_eq!(
            Excerpt {
                summary: body,
                remainder: "",
                split: false,
            },
            split(body, "READMORE")
        );
    }

    #[test]
    fn test_split_reconstructs_body() {
        let body = "Intro.\n\nREADMORE\n\nThe rest.\n";
        let excerpt = split(body, "READMORE");
        assert!(excerpt.split);
        assert_eq!("Intro.\n\n", excerpt.summary);
        assert_eq!(
            body,
            format!("{}{}{}", excerpt.summary, "READMORE", excerpt.remainder)
        );
    }

    #[test]
    fn test_split_at_first_marker() {
        let excerpt = split("a<!-- more -->b<!-- more -->c", "<!-- more -->");
        assert_eq!("a", excerpt.summary);
        assert_eq!("b<!-- more -->c", excerpt.remainder);
    }

    #[test]
    fn test_empty_marker_never_splits() {
        assert!(!split("body", "").split);
    }
}
