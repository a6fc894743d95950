//! Dialect and mapping configuration.
//!
//! Both are plain values, read-only for the duration of a call.

/// Non-standard protocol variations tolerated by the deserializer.
///
/// All options are disabled by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NonStandard {
    /// Discard any bytes before the start of the XML document.
    pub allow_invalid_http_content: bool,
    /// Accept date-time text outside the ISO-8601 profile.
    pub allow_non_standard_date_time: bool,
    /// Accept a fault code sent as numeric text.
    pub allow_string_fault_code: bool,
    /// Keep the first occurrence of a repeated struct member instead of failing.
    pub ignore_duplicate_members: bool,
    /// Map an empty date-time to [`crate::DATETIME_MIN`].
    pub map_empty_date_time_to_min_value: bool,
    /// Map an all-zeros date-time to [`crate::DATETIME_MIN`].
    pub map_zeros_date_time_to_min_value: bool,
}

/// A single [`NonStandard`] option, used to toggle options by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonStandardOption {
    AllowInvalidHttpContent,
    AllowNonStandardDateTime,
    AllowStringFaultCode,
    IgnoreDuplicateMembers,
    MapEmptyDateTimeToMinValue,
    MapZerosDateTimeToMinValue,
}

impl NonStandard {
    /// Standard XML-RPC, no variations allowed.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every variation allowed.
    pub fn all() -> Self {
        Self {
            allow_invalid_http_content: true,
            allow_non_standard_date_time: true,
            allow_string_fault_code: true,
            ignore_duplicate_members: true,
            map_empty_date_time_to_min_value: true,
            map_zeros_date_time_to_min_value: true,
        }
    }

    /// Returns a copy with the given option enabled.
    pub fn with(mut self, option: NonStandardOption) -> Self {
        match option {
            NonStandardOption::AllowInvalidHttpContent => self.allow_invalid_http_content = true,
            NonStandardOption::AllowNonStandardDateTime => {
                self.allow_non_standard_date_time = true
            }
            NonStandardOption::AllowStringFaultCode => self.allow_string_fault_code = true,
            NonStandardOption::IgnoreDuplicateMembers => self.ignore_duplicate_members = true,
            NonStandardOption::MapEmptyDateTimeToMinValue => {
                self.map_empty_date_time_to_min_value = true
            }
            NonStandardOption::MapZerosDateTimeToMinValue => {
                self.map_zeros_date_time_to_min_value = true
            }
        }

        self
    }
}

impl FromIterator<NonStandardOption> for NonStandard {
    fn from_iter<T: IntoIterator<Item = NonStandardOption>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::default(), |acc, option| acc.with(option))
    }
}

/// What to do when a struct is missing members of its target type.
///
/// Only the missing-member check is governed by this; format and
/// duplicate checks are unconditional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MappingAction {
    /// Missing members are an error.
    #[default]
    Strict,
    /// Missing members are left unset.
    Lenient,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_options() {
        let dialect: NonStandard = [
            NonStandardOption::IgnoreDuplicateMembers,
            NonStandardOption::AllowStringFaultCode,
        ]
        .into_iter()
        .collect();

        assert!(dialect.ignore_duplicate_members);
        assert!(dialect.allow_string_fault_code);
        assert!(!dialect.allow_invalid_http_content);
        assert_ne!(dialect, NonStandard::all());
        assert_eq!(NonStandard::none(), NonStandard::default());
    }
}
