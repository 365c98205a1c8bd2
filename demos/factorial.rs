//! 阶乘示例：运行脚本，再通过注册表函数引用调用脚本里定义的函数
//!
//! ```text
//! cargo run --example factorial
//! ```

use easylua::config::StateOptions;
use easylua::log::{LogConfig, Level};
use easylua::{Function, State};
use std::process::ExitCode;

const FACTORIAL_LUA: &str = r#"
-- the classic recursive example
function factorial(n)
    if n == 0 then
        return 1
    else
        return n * factorial(n - 1)
    end
end

-- and its tail recursive variant
fact = function(n)
    local f
    f = function(m, a)
        if m == 0 then return a end
        return f(m - 1, m * a)
    end
    return f(n, 1)
end
"#;

fn run(state: &State) -> easylua::Result<()> {
    let factorial: Function = state.get_global("factorial")?;
    let result: i64 = factorial.call(5)?.get()?;
    println!("factorial(5) = {result}");

    let fact: Function = state.get_global("fact")?;
    let result: i64 = fact.call(10)?.get()?;
    println!("fact(10) = {result}");

    Ok(())
}

fn main() -> ExitCode {
    let (logger, _) = LogConfig::new(Level::Warn).with_stderr().init();
    let state = match State::with_options(StateOptions::default().with_logger(logger)) {
        Ok(state) => state,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = state.run(FACTORIAL_LUA);
    if !outcome.is_ok() {
        eprintln!("Error: {outcome}");
        return ExitCode::FAILURE;
    }

    match run(&state) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
