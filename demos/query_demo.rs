use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    geoatlas::example_apps::run_query_demo(std::env::args().skip(1))
}
