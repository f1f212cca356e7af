//! Built-in inputs for `match-demo analyze --sample`.

pub const SAMPLE_RESUME: &str = "\
Jordan Reyes
Software Engineer

EXPERIENCE
Senior Software Developer | Northwind Systems | 2020-Present
- Led development of a microservices platform serving 1M+ users
- Improved request latency by 40% through profiling and caching
- Mentored three junior developers
- Technologies: Python, React, AWS, Docker, PostgreSQL

Software Developer | Brightline Labs | 2018-2020
- Built full-stack web applications
- Implemented CI/CD pipelines that cut deployment time by 60%
- Technologies: JavaScript, Node.js, MongoDB, Git

SKILLS
- Programming: Python, JavaScript, Java, SQL
- Cloud: AWS (EC2, S3, Lambda, RDS), Docker, Kubernetes
- Databases: PostgreSQL, MongoDB, Redis
- Tools: Git, Jenkins, Terraform

EDUCATION
- BSc Computer Science, State University, 2018
- AWS Certified Solutions Architect, Associate
";

pub const SAMPLE_JOB_DESCRIPTION: &str = "\
Senior Software Engineer, Cloud Platform Team

ABOUT THE ROLE
We are looking for a Senior Software Engineer to design and build scalable
cloud-native services used by millions of people.

REQUIREMENTS
- 5+ years of software development experience
- Strong proficiency in Python and JavaScript
- Experience with React and modern frontend frameworks
- Deep knowledge of AWS services (EC2, S3, Lambda, RDS)
- Experience with Docker and Kubernetes
- Strong understanding of microservices architecture
- Experience with CI/CD pipelines and DevOps practices
- Experience leading development teams

PREFERRED
- Infrastructure as Code (Terraform, CloudFormation)
- Monitoring and observability tooling
- Go or Rust experience
- Open source contributions
";
