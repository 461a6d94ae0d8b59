pub mod check;
pub mod mount;
pub mod options;
pub mod unmount;
