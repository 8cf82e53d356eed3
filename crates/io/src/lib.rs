// File I/O collaborators: scan/POAM inputs in, Excel report out

pub mod csv;
pub mod report;
pub mod xlsx;
