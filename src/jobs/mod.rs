pub mod vault_watcher_job;
