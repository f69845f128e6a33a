use persist_remote::{FaultCategory, RemoteError};

/// Type-name marker for object-store eventual-consistency faults.
pub const S3_EXCEPTION_MARKER: &str = "S3Exception";

/// What the retry driver does with a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Retry without operator-visible logging.
    TransientSilent,
    /// Retry, logging the fault with full detail.
    TransientLogged,
    /// Stop and propagate.
    Fatal,
}

impl Classification {
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Fatal)
    }
}

/// How a rule matches a fault's reported type name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Matcher {
    Any,
    /// Matches when the type name contains any of the substrings.
    TypeNameContains(Vec<String>),
}

impl Matcher {
    pub fn matches(&self, type_name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::TypeNameContains(markers) => markers.iter().any(|m| type_name.contains(m.as_str())),
        }
    }
}

/// One row of the classification table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub category: FaultCategory,
    pub matcher: Matcher,
    pub classification: Classification,
}

impl Rule {
    pub fn new(category: FaultCategory, matcher: Matcher, classification: Classification) -> Self {
        Self {
            category,
            matcher,
            classification,
        }
    }
}

/// Ordered rule table; the first matching rule wins and anything unmatched
/// is [`Classification::Fatal`].
///
/// The default table, given transient type-name markers `M`:
///
/// | category       | matcher            | classification   |
/// |----------------|--------------------|------------------|
/// | end-of-stream  | any                | transient-silent |
/// | socket timeout | any                | transient-silent |
/// | I/O            | type name has `M`  | transient-silent |
/// | I/O            | any                | transient-logged |
/// | runtime        | type name has `M`  | transient-silent |
///
/// Matching on client type names is inherently tied to client library
/// versions; new markers are added through the policy, not the table code.
#[derive(Clone, Debug)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    /// A classifier over an explicit rule table.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The default table with the given transient type-name markers.
    pub fn with_transient_markers<S: AsRef<str>>(markers: &[S]) -> Self {
        let markers: Vec<String> = markers.iter().map(|m| m.as_ref().to_string()).collect();
        let transient_name = Matcher::TypeNameContains(markers);
        Self::new(vec![
            Rule::new(FaultCategory::EndOfStream, Matcher::Any, Classification::TransientSilent),
            Rule::new(FaultCategory::SocketTimeout, Matcher::Any, Classification::TransientSilent),
            Rule::new(FaultCategory::Io, transient_name.clone(), Classification::TransientSilent),
            Rule::new(FaultCategory::Io, Matcher::Any, Classification::TransientLogged),
            Rule::new(FaultCategory::Runtime, transient_name, Classification::TransientSilent),
        ])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn classify(&self, fault: &RemoteError) -> Classification {
        let category = fault.category();
        let type_name = fault.type_name();
        self.rules
            .iter()
            .find(|rule| rule.category == category && rule.matcher.matches(type_name))
            .map(|rule| rule.classification)
            .unwrap_or(Classification::Fatal)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_transient_markers(&[S3_EXCEPTION_MARKER])
    }
}

/// Classify with the default table.
pub fn classify(fault: &RemoteError) -> Classification {
    Classifier::default().classify(fault)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_and_timeout_are_silent() {
        assert_eq!(classify(&RemoteError::EndOfStream("x".into())), Classification::TransientSilent);
        assert_eq!(classify(&RemoteError::SocketTimeout("x".into())), Classification::TransientSilent);
    }

    #[test]
    fn s3_io_fault_is_silent() {
        let fault = RemoteError::io("org.apache.hadoop.fs.s3.S3Exception", "503 Slow Down");
        assert_eq!(classify(&fault), Classification::TransientSilent);
    }

    #[test]
    fn other_io_fault_is_logged() {
        assert_eq!(
            classify(&RemoteError::io("ConnectionReset", "reset by peer")),
            Classification::TransientLogged
        );
        assert_eq!(
            classify(&RemoteError::NotFound("/missing".into())),
            Classification::TransientLogged
        );
    }

    #[test]
    fn s3_runtime_fault_is_silent() {
        let fault = RemoteError::runtime("org.jets3t.service.S3ServiceException", "internal error");
        assert_eq!(classify(&fault), Classification::TransientSilent);
    }

    #[test]
    fn other_runtime_fault_is_fatal() {
        let fault = RemoteError::runtime("IllegalArgumentException", "bad path");
        assert_eq!(classify(&fault), Classification::Fatal);
    }

    #[test]
    fn uncategorized_fault_is_fatal() {
        // Even an S3-looking name does not rescue a fault outside the
        // I/O and runtime categories.
        let fault = RemoteError::other("S3Exception", "interrupted");
        assert_eq!(classify(&fault), Classification::Fatal);
    }

    #[test]
    fn custom_markers_extend_transient_set() {
        // Client libraries rename their consistency faults across versions;
        // this is the compatibility seam for that.
        let classifier = Classifier::with_transient_markers(&["S3Exception", "AmazonServiceException"]);
        let fault = RemoteError::runtime("com.amazonaws.AmazonServiceException", "throttled");
        assert_eq!(classifier.classify(&fault), Classification::TransientSilent);
        assert_eq!(classify(&fault), Classification::Fatal);
    }

    #[test]
    fn empty_table_is_all_fatal() {
        let classifier = Classifier::new(Vec::new());
        assert_eq!(
            classifier.classify(&RemoteError::EndOfStream("x".into())),
            Classification::Fatal
        );
    }

    #[test]
    fn default_table_shape() {
        let classifier = Classifier::default();
        assert_eq!(classifier.rules().len(), 5);
        assert!(classifier.rules()[3].classification.is_transient());
    }
}
