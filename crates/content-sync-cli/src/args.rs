use std::ffi::OsString;

/// Command line of the wrapper: everything after the program name belongs to kolibri
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Cli {
    /// Arguments passed verbatim to kolibri
    pub args: Vec<OsString>,
}

impl Cli {
    pub fn from_env() -> Self {
        Self::from_args_os(std::env::args_os())
    }

    /// Build from a full argv, program name included
    pub fn from_args_os<I, T>(argv: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self {
            args: argv.into_iter().skip(1).map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cli: &Cli) -> Vec<&str> {
        cli.args.iter().filter_map(|a| a.to_str()).collect()
    }

    #[test]
    fn passes_everything_through() {
        let cli = Cli::from_args_os(["kolibri-wrapper", "start", "--foreground", "--port", "8080"]);
        assert_eq!(args(&cli), vec!["start", "--foreground", "--port", "8080"]);
    }

    #[test]
    fn double_dash_is_kept() {
        let cli = Cli::from_args_os(["kolibri-wrapper", "--", "start"]);
        assert_eq!(args(&cli), vec!["--", "start"]);
    }

    #[test]
    fn help_and_version_belong_to_kolibri() {
        let cli = Cli::from_args_os(["kolibri-wrapper", "--help"]);
        assert_eq!(args(&cli), vec!["--help"]);

        let cli = Cli::from_args_os(["kolibri-wrapper", "--version"]);
        assert_eq!(args(&cli), vec!["--version"]);
    }

    #[test]
    fn no_arguments() {
        let cli = Cli::from_args_os(["kolibri-wrapper"]);
        assert!(cli.args.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_arguments_survive() {
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(vec![b'f', 0xff, b'o']);
        let cli = Cli::from_args_os([OsString::from("kolibri-wrapper"), raw.clone()]);
        assert_eq!(cli.args, vec![raw]);
    }
}
