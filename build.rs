fn main() {
    // tauri.conf.json and the capability files are only read when the desktop
    // shell is compiled in.
    #[cfg(feature = "desktop")]
    {
        tauri_build::build();
    }
}
