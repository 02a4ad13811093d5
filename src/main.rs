use human_panic::setup_panic;

use ows_grade::cli::{
    check_for_stdout_stream, get_grading_options, get_log_file, get_matches, get_verbosity,
    wants_json,
};
use ows_grade::logging::init_logger;
use ows_grade::workflow::{grade_submissions, render_json, render_text};

fn run() -> anyhow::Result<()> {
    let matches = get_matches();

    let log_file = get_log_file(&matches)?;
    init_logger(get_verbosity(&matches), &log_file)?;

    let context = grade_submissions(get_grading_options(&matches))?;

    if wants_json(&matches) {
        println!("{}", render_json(&context)?);
    } else {
        println!("{}", render_text(&context));
    }

    Ok(())
}

fn main() {
    setup_panic!();

    let code = match run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    };

    check_for_stdout_stream();
    std::process::exit(code);
}
