use elf2rpl::driver::Driver;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let driver = match Driver::parse_cli_args(&args) {
        Ok(Some(driver)) => driver,
        // Help was printed, or no work was requested.
        Ok(None) => return,
        Err(e) => {
            println!("ERROR: {}", e);
            std::process::exit(-1);
        }
    };

    if let Err(e) = driver.run() {
        println!("ERROR: {}", e);
        std::process::exit(-1);
    }
}
