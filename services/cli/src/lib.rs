mod cli;
mod demo;
mod evaluate;

use quality_impact::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
