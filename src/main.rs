fn main() {
    gendsl::cli::run();
}
