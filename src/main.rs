fn main() {
    std::process::exit(serverpack_installer_lib::run());
}
