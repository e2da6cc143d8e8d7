//! Input format collaborator.
//!
//! The engine never serializes variables itself; a problem supplies an
//! [`IoFormat`] that turns bound state into input text and parses literal
//! sample blocks back into state.

/// Line-oriented input serialization for a problem's state type
pub trait IoFormat<S>: Send + Sync {
    /// Render the currently bound variables as an input file
    fn write_input(&self, state: &S) -> anyhow::Result<String>;

    /// Bind variables from a literal sample block
    fn parse_input(&self, content: &str) -> anyhow::Result<S>;

    /// Merge the inputs of several test cases into one file.
    /// Default: the case count on its own line followed by every input.
    fn combine_inputs(&self, inputs: &[String]) -> String {
        let mut combined = format!("{}\n", inputs.len());
        for input in inputs {
            combined.push_str(input);
            if !input.ends_with('\n') {
                combined.push('\n');
            }
        }
        combined
    }
}
