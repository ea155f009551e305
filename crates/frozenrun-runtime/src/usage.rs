//! Help and diagnostic text

use crate::config::LauncherConfig;
use crate::context::BootstrapContext;

/// The `-h` text.
pub fn help_text(config: &LauncherConfig) -> String {
    format!(
        "\
Usage: {name} [options] [<script>] [parameters]

Version: {version} (release {release})

Available options:

-b:       run the given <script> file as bytecode
-c:       compile and run <script> directly as code
-d:       enable debug mode (-dd for level 2)
-h:       show this help text
-i:       enable interactive inspection mode
-m:       import and run a module <script> available on the search path
-s:       ignore user site
-u:       open stdout/stderr in unbuffered mode
-v:       run in verbose mode (-vv for level 2)
-B:       don't write byte code files
-E:       ignore environment variables (only {path_var})
-I:       isolate from environment: same as -E -s
-O:       run in optimized mode (-OO for level 2)
-P:       don't add script or current dir to the search path
-R:       not implemented; hash randomization is not supported
-S:       skip site initialisation and disable support for .pth files
-V:       print the version and exit
-W arg:   add arg as warning filter
-3:       not implemented; only for compatibility
-X arg:   not implemented; only for compatibility

Without options, the given <script> file is loaded and run. Parameters
are passed to the script as its argument vector.

Interactive mode is started if no <script> file is given.
",
        name = config.name,
        version = config.version,
        release = config.release,
        path_var = config.env.path,
    )
}

/// Banner shown when entering interactive mode without a script.
pub fn banner(config: &LauncherConfig) -> String {
    format!(
        "{} {} (release {})\nType exit() or end-of-input to leave.",
        config.name, config.version, config.release
    )
}

/// The `-d` dump of the resolved context.
pub fn debug_info(ctx: &BootstrapContext, config: &LauncherConfig) -> String {
    let flags = &ctx.flags;
    let filters: Vec<String> = ctx.warnings.iter().map(|f| f.to_string()).collect();
    format!(
        "\
### {name} debug information

# Name and version
name = {name:?}
version = {version:?}
release = {release:?}

# Files and directories
executable = {executable:?}
cwd = {cwd:?}
run_mode = {run_mode:?}

# Options
verbose = {verbose}
debug = {debug}
optimize = {optimize}
bytecode = {bytecode}
inspect = {inspect}
unbuffered = {unbuffered}
ignore_environment = {ignore_environment}
ignore_pth_files = {ignore_pth_files}
skip_site_main = {skip_site_main}
skip_user_site = {skip_user_site}
safe_path = {safe_path}
dont_write_bytecode = {dont_write_bytecode}
https_verify = {https_verify}
warning_filters = {filters:?}
",
        name = config.name,
        version = config.version,
        release = config.release,
        executable = ctx.executable.display().to_string(),
        cwd = ctx.cwd.display().to_string(),
        run_mode = ctx.run_mode,
        verbose = flags.verbose,
        debug = flags.debug,
        optimize = flags.optimize,
        bytecode = flags.bytecode,
        inspect = flags.inspect,
        unbuffered = flags.unbuffered,
        ignore_environment = flags.ignore_environment,
        ignore_pth_files = flags.ignore_pth_files,
        skip_site_main = flags.skip_site_main,
        skip_user_site = flags.skip_user_site,
        safe_path = flags.safe_path,
        dont_write_bytecode = flags.dont_write_bytecode,
        https_verify = flags.https_verify,
        filters = filters,
    )
}
