/// Identification of a use case for logging and UI titles
pub trait UseCaseMetadata {
    /// Index, e.g. "u508"
    fn usecase_index() -> &'static str;

    /// Technical name, e.g. "record_reception"
    fn usecase_name() -> &'static str;

    /// Name shown in the UI
    fn display_name() -> &'static str;

    fn description() -> &'static str {
        ""
    }

    /// "u508_record_reception"
    fn full_name() -> String {
        format!("{}_{}", Self::usecase_index(), Self::usecase_name())
    }
}
