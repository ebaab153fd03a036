fn main() -> Result<(), Box<dyn std::error::Error>> {
    nebras::cli::main()
}
