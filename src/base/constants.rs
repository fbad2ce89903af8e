//! Domain constants.

/// Extension of NED source files (compared case-insensitively).
pub const NED_EXTENSION: &str = "ned";

/// File that declares the package of its folder.
pub const PACKAGE_NED_FILENAME: &str = "package.ned";

/// Per-project file listing the NED source folders, one per line.
pub const NEDFOLDERS_FILENAME: &str = ".nedfolders";

/// Display label of the built-in declarations pseudo-file.
pub const BUILTIN_FILE_LABEL: &str = "[builtin-declarations]";

/// Package separator in qualified names.
pub const QNAME_SEPARATOR: char = '.';

/// Types every project sees before any file-derived type is registered.
pub const BUILTIN_DECLARATIONS: &str = r#"
package ned;

channel IdealChannel
{
    @class(cIdealChannel);
}

channel DelayChannel
{
    @class(cDelayChannel);
    bool disabled = default(false);
    double delay = default(0s) @unit(s);
}

channel DatarateChannel
{
    @class(cDatarateChannel);
    bool disabled = default(false);
    double delay = default(0s) @unit(s);
    double datarate = default(0bps) @unit(bps);
    double ber = default(0);
    double per = default(0);
}

moduleinterface IBidirectionalChannel
{
    gates:
        inout a;
        inout b;
}

moduleinterface IUnidirectionalChannel
{
    gates:
        input i;
        output o;
}
"#;
