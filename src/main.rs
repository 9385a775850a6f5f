fn main() {
    if let Err(err) = update_feed_lib::run() {
        log::error!("{err:#}");
        eprintln!("update-feed: {err:#}");
        std::process::exit(1);
    }
}
