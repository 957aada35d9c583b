mod microlp_solver;

pub use microlp_solver::MicrolpSolver;
