mod decode_loop;
mod fps;
mod view;

pub use view::ScannerView;
