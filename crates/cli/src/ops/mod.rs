pub mod container;
pub mod cp;
pub mod exists;
pub mod fetch;
pub mod init;
pub mod ls;
pub mod put;
pub mod rm;
pub mod stat;
pub mod url;
pub mod version;

pub use container::Container;
pub use cp::Cp;
pub use exists::Exists;
pub use fetch::Fetch;
pub use init::Init;
pub use ls::Ls;
pub use put::Put;
pub use rm::Rm;
pub use stat::Stat;
pub use url::Url;
pub use version::Version;
