mod registry;
mod run_loop;
mod time;
