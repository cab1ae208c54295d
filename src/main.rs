fn main() {
    stackmatch::run_cli();
}
