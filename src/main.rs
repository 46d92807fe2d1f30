fn main() {
    medconsult_lib::run()
}
