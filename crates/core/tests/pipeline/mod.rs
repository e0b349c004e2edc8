mod execution;
mod frontend;
mod interrupts;
mod memory;
mod speculation;
mod traps;
